use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: bool,
}

impl HealthData {
    pub fn from_probe(database: bool) -> Self {
        Self {
            status: if database { "ok" } else { "degraded" }.to_string(),
            database,
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, "database health probe failed");
            false
        }
    };

    Json(ApiResponse::success(
        "Health check",
        HealthData::from_probe(database),
        Some(Meta::empty()),
    ))
}
