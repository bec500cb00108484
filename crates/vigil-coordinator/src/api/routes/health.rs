//! Service health and readiness endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::ApiResult, state::AppState};

/// Consolidated service health response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[schema(example = "healthy")]
    pub database: String,
    #[schema(example = 5)]
    pub pool_size: u32,
    #[schema(example = 4)]
    pub pool_idle: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/live", get(liveness_check))
}

/// Full health probe including a database round trip.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "healthy".to_string(),
        Err(_) => "unhealthy".to_string(),
    };

    let status = if database == "healthy" { "ok" } else { "degraded" };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        pool_size: state.pool.size(),
        pool_idle: state.pool.num_idle(),
    }))
}

/// Cheap liveness probe with no dependencies.
#[utoipa::path(
    get,
    path = "/live",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness_check() -> &'static str {
    "alive"
}
