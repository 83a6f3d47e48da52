use axum::{
    Extension, Form, Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            DashboardPage, OrderFilterQuery, OrdersPage, ProductFormPage, ProductsPage,
            ReportsPage, SearchQuery, UpdateOrderStatusForm, UsersPage,
        },
        products::{ProductForm, UpdateProductForm},
    },
    error::AppResult,
    response::ApiResponse,
    routes::{flash_to, page},
    services::{admin_service, product_service},
    session::{CurrentUser, FlashLevel},
    state::AppState,
};

const PRODUCTS_PATH: &str = "/admin-panel/products/";
const ADD_PRODUCT_PATH: &str = "/admin-panel/products/add/";
const ORDERS_PATH: &str = "/admin-panel/orders/";

/// Back-office routes, mounted under `/admin-panel` behind the staff guard.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/", get(dashboard))
        .route("/users/", get(users))
        .route("/products/", get(products))
        .route("/products/add/", get(add_product_page).post(add_product))
        .route("/products/{id}/edit/", post(edit_product))
        .route("/orders/", get(orders))
        .route("/orders/{order_id}/update-status/", post(update_order_status))
        .route("/reports/", get(reports))
}

#[utoipa::path(
    get,
    path = "/admin-panel/dashboard/",
    responses(
        (status = 200, description = "Store totals, recent orders and low stock", body = ApiResponse<DashboardPage>),
        (status = 303, description = "Not staff, redirect to /")
    ),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<DashboardPage>>> {
    let data = admin_service::dashboard(&state).await?;
    Ok(page(&session, "Dashboard", data).await)
}

#[utoipa::path(
    get,
    path = "/admin-panel/users/",
    params(("search" = Option<String>, Query, description = "Match on email or name")),
    responses((status = 200, description = "Users with profile phone", body = ApiResponse<UsersPage>)),
    tag = "Admin"
)]
pub async fn users(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<UsersPage>>> {
    let data = admin_service::list_users(&state, query.search).await?;
    Ok(page(&session, "Users", data).await)
}

#[utoipa::path(
    get,
    path = "/admin-panel/products/",
    params(("search" = Option<String>, Query, description = "Match on product or category name")),
    responses((status = 200, description = "Products with category", body = ApiResponse<ProductsPage>)),
    tag = "Admin"
)]
pub async fn products(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<ProductsPage>>> {
    let data = admin_service::list_products(&state, query.search).await?;
    Ok(page(&session, "Products", data).await)
}

#[utoipa::path(
    get,
    path = "/admin-panel/products/add/",
    responses((status = 200, description = "Categories for the product form", body = ApiResponse<ProductFormPage>)),
    tag = "Admin"
)]
pub async fn add_product_page(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<ProductFormPage>>> {
    let data = admin_service::product_form(&state).await?;
    Ok(page(&session, "Add product", data).await)
}

#[utoipa::path(
    post,
    path = "/admin-panel/products/add/",
    request_body(content = ProductForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the product list, or back to the form on error")),
    tag = "Admin"
)]
pub async fn add_product(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Response {
    match product_service::create_product(&state, &admin, form).await {
        Ok(product) => {
            flash_to(
                &session,
                FlashLevel::Success,
                format!("Product {} added successfully!", product.name),
                PRODUCTS_PATH,
            )
            .await
        }
        Err(err) => err.flash_redirect(&session, ADD_PRODUCT_PATH).await,
    }
}

#[utoipa::path(
    post,
    path = "/admin-panel/products/{id}/edit/",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body(content = UpdateProductForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the product list")),
    tag = "Admin"
)]
pub async fn edit_product(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<UpdateProductForm>,
) -> Response {
    match product_service::update_product(&state, &admin, id, form).await {
        Ok(product) => {
            flash_to(
                &session,
                FlashLevel::Success,
                format!("Product {} updated.", product.name),
                PRODUCTS_PATH,
            )
            .await
        }
        Err(err) => err.flash_redirect(&session, PRODUCTS_PATH).await,
    }
}

#[utoipa::path(
    get,
    path = "/admin-panel/orders/",
    params(("status" = Option<String>, Query, description = "Order status filter")),
    responses(
        (status = 200, description = "Orders with customer and items", body = ApiResponse<OrdersPage>),
        (status = 303, description = "Unknown status filter, redirect to the unfiltered list")
    ),
    tag = "Admin"
)]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderFilterQuery>,
) -> Response {
    let status = match admin_service::parse_status_filter(query.status.as_deref()) {
        Ok(status) => status,
        Err(err) => return err.flash_redirect(&session, ORDERS_PATH).await,
    };
    match admin_service::list_orders(&state, status).await {
        Ok(data) => page(&session, "Orders", data).await.into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/admin-panel/orders/{order_id}/update-status/",
    params(("order_id" = Uuid, Path, description = "Order id")),
    request_body(content = UpdateOrderStatusForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the order list")),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    session: Session,
    Path(order_id): Path<Uuid>,
    Form(form): Form<UpdateOrderStatusForm>,
) -> Response {
    match admin_service::update_order_status(&state, &admin, order_id, &form.status).await {
        Ok(order) => {
            flash_to(
                &session,
                FlashLevel::Success,
                format!("Order #{} status updated to {}.", order.id, order.status.label()),
                ORDERS_PATH,
            )
            .await
        }
        Err(err) => err.flash_redirect(&session, ORDERS_PATH).await,
    }
}

#[utoipa::path(
    get,
    path = "/admin-panel/reports/",
    responses((status = 200, description = "Sales reports", body = ApiResponse<ReportsPage>)),
    tag = "Admin"
)]
pub async fn reports(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<ReportsPage>>> {
    let data = admin_service::reports(&state).await?;
    Ok(page(&session, "Reports", data).await)
}
