use axum::{
    Form, Json, Router,
    extract::{Path, State, rejection::FormRejection},
    response::Response,
    routing::{get, post},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::cart::{CartView, QuantityForm},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::{flash_to, page},
    services::cart_service::{self, CartItemChange},
    session::FlashLevel,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart/", get(view_cart))
        .route("/add-to-cart/{product_id}/", post(add_to_cart))
        .route("/remove-from-cart/{item_id}/", post(remove_from_cart))
        .route("/update-cart-item/{item_id}/", post(update_cart_item))
}

/// A bare POST without a form body means quantity 1; a malformed body is rejected.
fn quantity_or_default(form: Result<Form<QuantityForm>, FormRejection>) -> AppResult<i32> {
    match form {
        Ok(Form(form)) => Ok(form.quantity),
        Err(FormRejection::InvalidFormContentType(_)) => Ok(QuantityForm::default().quantity),
        Err(_) => Err(AppError::BadRequest("Quantity must be a whole number.".into())),
    }
}

#[utoipa::path(
    get,
    path = "/cart/",
    responses(
        (status = 200, description = "Cart contents and totals", body = ApiResponse<CartView>),
        (status = 303, description = "Anonymous, redirect to /login/")
    ),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let cart = cart_service::view_cart(&state, user.id).await?;
    Ok(page(&session, "Cart", cart).await)
}

#[utoipa::path(
    post,
    path = "/add-to-cart/{product_id}/",
    params(("product_id" = Uuid, Path, description = "Product id")),
    request_body(content = QuantityForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /cart/")),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(product_id): Path<Uuid>,
    form: Result<Form<QuantityForm>, FormRejection>,
) -> Response {
    let added = match quantity_or_default(form) {
        Ok(quantity) => cart_service::add_to_cart(&state, user.id, product_id, quantity).await,
        Err(err) => Err(err),
    };
    match added {
        Ok(()) => flash_to(&session, FlashLevel::Success, "Item added to cart!", "/cart/").await,
        Err(err) => err.flash_redirect(&session, "/products/").await,
    }
}

#[utoipa::path(
    post,
    path = "/remove-from-cart/{item_id}/",
    params(("item_id" = Uuid, Path, description = "Cart item id")),
    responses((status = 303, description = "Redirect to /cart/")),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(item_id): Path<Uuid>,
) -> Response {
    match cart_service::remove_from_cart(&state, user.id, item_id).await {
        Ok(()) => {
            flash_to(&session, FlashLevel::Success, "Item removed from cart!", "/cart/").await
        }
        Err(err) => err.flash_redirect(&session, "/cart/").await,
    }
}

#[utoipa::path(
    post,
    path = "/update-cart-item/{item_id}/",
    params(("item_id" = Uuid, Path, description = "Cart item id")),
    request_body(content = QuantityForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /cart/")),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(item_id): Path<Uuid>,
    form: Result<Form<QuantityForm>, FormRejection>,
) -> Response {
    let changed = match quantity_or_default(form) {
        Ok(quantity) => cart_service::update_cart_item(&state, user.id, item_id, quantity).await,
        Err(err) => Err(err),
    };
    match changed {
        Ok(CartItemChange::Updated) => {
            flash_to(&session, FlashLevel::Success, "Cart updated!", "/cart/").await
        }
        Ok(CartItemChange::Removed) => {
            flash_to(&session, FlashLevel::Success, "Item removed from cart!", "/cart/").await
        }
        Err(err) => err.flash_redirect(&session, "/cart/").await,
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::FromRequest, http::Request};

    use super::*;

    async fn extract(content_type: Option<&str>, body: &'static str) -> AppResult<i32> {
        let mut builder = Request::builder().method("POST").uri("/update-cart-item/x/");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();
        quantity_or_default(Form::<QuantityForm>::from_request(request, &()).await)
    }

    const URLENCODED: Option<&str> = Some("application/x-www-form-urlencoded");

    #[tokio::test]
    async fn bare_post_defaults_to_one() {
        assert_eq!(extract(None, "").await.unwrap(), 1);
        assert_eq!(extract(URLENCODED, "").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn submitted_quantity_is_used() {
        assert_eq!(extract(URLENCODED, "quantity=4").await.unwrap(), 4);
        assert_eq!(extract(URLENCODED, "quantity=0").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_quantity_is_rejected() {
        let err = extract(URLENCODED, "quantity=abc").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.to_string(), "Quantity must be a whole number.");
    }
}
