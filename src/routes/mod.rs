use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tower_sessions::Session;

use crate::{
    middleware::auth::require_staff,
    response::ApiResponse,
    session::{FlashLevel, push_flash, take_flash},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod doc;
pub mod health;
pub mod orders;
pub mod products;

/// Storefront routes plus the staff-only back-office under `/admin-panel`.
pub fn create_router(state: AppState) -> Router<AppState> {
    let admin = admin::router().route_layer(from_fn_with_state(state, require_staff));

    Router::new()
        .merge(products::router())
        .merge(auth::router())
        .merge(cart::router())
        .merge(orders::router())
        .nest("/admin-panel", admin)
}

/// Wrap page data in the JSON envelope, draining pending flash messages.
pub(crate) async fn page<T: Serialize>(
    session: &Session,
    message: &str,
    data: T,
) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(message, data, None).with_messages(take_flash(session).await))
}

/// Queue a flash message and redirect. A failed flash write only loses the message.
pub(crate) async fn flash_to(
    session: &Session,
    level: FlashLevel,
    text: impl Into<String>,
    to: &str,
) -> Response {
    if let Err(err) = push_flash(session, level, text).await {
        tracing::warn!(error = %err, "failed to store flash message");
    }
    Redirect::to(to).into_response()
}
