use axum::{
    Form, Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutForm, CheckoutPage, OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::{flash_to, page},
    services::order_service,
    session::FlashLevel,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout/", get(checkout_page).post(checkout))
        .route("/order-confirmation/{order_id}/", get(order_confirmation))
        .route("/my-orders/", get(my_orders))
}

#[utoipa::path(
    get,
    path = "/checkout/",
    responses(
        (status = 200, description = "Cart summary and default phone", body = ApiResponse<CheckoutPage>),
        (status = 303, description = "Empty cart, redirect to /cart/")
    ),
    tag = "Orders"
)]
pub async fn checkout_page(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
) -> Response {
    match order_service::checkout_page(&state, user.id).await {
        Ok(data) => page(&session, "Checkout", data).await.into_response(),
        Err(AppError::EmptyCart) => AppError::EmptyCart.flash_redirect(&session, "/cart/").await,
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/checkout/",
    request_body(content = CheckoutForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the order confirmation")),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Response {
    match order_service::checkout(&state, user.id, form).await {
        Ok(order) => {
            flash_to(
                &session,
                FlashLevel::Success,
                "Order placed successfully!",
                &format!("/order-confirmation/{}/", order.id),
            )
            .await
        }
        Err(AppError::EmptyCart) => AppError::EmptyCart.flash_redirect(&session, "/cart/").await,
        Err(err) => err.flash_redirect(&session, "/checkout/").await,
    }
}

#[utoipa::path(
    get,
    path = "/order-confirmation/{order_id}/",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "No such order for this user")
    ),
    tag = "Orders"
)]
pub async fn order_confirmation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let order = order_service::get_order(&state, user.id, order_id).await?;
    Ok(page(&session, "Order confirmation", order).await)
}

#[utoipa::path(
    get,
    path = "/my-orders/",
    responses((status = 200, description = "Orders of the current user", body = ApiResponse<OrderList>)),
    tag = "Orders"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let orders = order_service::list_orders(&state, user.id).await?;
    Ok(page(&session, "My orders", orders).await)
}
