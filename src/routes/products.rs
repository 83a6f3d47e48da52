use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::products::{
        CatalogPage, CatalogQuery, HomePage, ProductDetailPage, StaticPage, StockPage,
    },
    error::AppResult,
    response::ApiResponse,
    routes::page,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/products/", get(catalog))
        .route("/product/{id}/", get(product_detail))
        .route("/stock/", get(stock))
        .route("/aboutus/", get(about_us))
        .route("/contact/", get(contact))
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Featured products", body = ApiResponse<HomePage>)),
    tag = "Catalog"
)]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<HomePage>>> {
    let data = product_service::home_products(&state).await?;
    Ok(page(&session, "Home", data).await)
}

#[utoipa::path(
    get,
    path = "/products/",
    params(("category" = Option<String>, Query, description = "Category name")),
    responses((status = 200, description = "Active products", body = ApiResponse<CatalogPage>)),
    tag = "Catalog"
)]
pub async fn catalog(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<ApiResponse<CatalogPage>>> {
    let data = product_service::catalog(&state, query.category).await?;
    Ok(page(&session, "Products", data).await)
}

#[utoipa::path(
    get,
    path = "/product/{id}/",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with related products", body = ApiResponse<ProductDetailPage>),
        (status = 404, description = "Unknown or inactive product")
    ),
    tag = "Catalog"
)]
pub async fn product_detail(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetailPage>>> {
    let data = product_service::product_detail(&state, id).await?;
    Ok(page(&session, "Product", data).await)
}

#[utoipa::path(
    get,
    path = "/stock/",
    responses((status = 200, description = "Stock levels", body = ApiResponse<StockPage>)),
    tag = "Catalog"
)]
pub async fn stock(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<StockPage>>> {
    let data = product_service::stock_levels(&state).await?;
    Ok(page(&session, "Stock", data).await)
}

#[utoipa::path(
    get,
    path = "/aboutus/",
    responses((status = 200, description = "About page", body = ApiResponse<StaticPage>)),
    tag = "Catalog"
)]
pub async fn about_us(session: Session) -> Json<ApiResponse<StaticPage>> {
    let data = StaticPage {
        page: "aboutus".into(),
        title: "About Us".into(),
    };
    page(&session, "About Us", data).await
}

#[utoipa::path(
    get,
    path = "/contact/",
    responses((status = 200, description = "Contact page", body = ApiResponse<StaticPage>)),
    tag = "Catalog"
)]
pub async fn contact(session: Session) -> Json<ApiResponse<StaticPage>> {
    let data = StaticPage {
        page: "contact".into(),
        title: "Contact".into(),
    };
    page(&session, "Contact", data).await
}
