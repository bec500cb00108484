//! Baseline calibration: raw PPG windows in, stored reference metrics out.

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;
use vigil_common::rpc::{BaselineRequest, BaselineResponse};
use vigil_db::{BaselineRepository, DeviceRepository};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/baseline", post(compute_baseline))
}

/// Compute and store a calibration baseline for a device.
#[utoipa::path(
    post,
    path = "/baseline",
    request_body = BaselineRequest,
    responses(
        (status = 200, description = "Baseline computed and stored", body = BaselineResponse),
        (status = 400, description = "No calibration window produced usable metrics"),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn compute_baseline(
    State(state): State<AppState>,
    Json(request): Json<BaselineRequest>,
) -> ApiResult<Json<BaselineResponse>> {
    let device = DeviceRepository::find_by_code(&state.pool, &request.device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    let sample_rate = request.sample_rate.unwrap_or(50);
    let metrics = vigil_hrv::compute_baseline(&request.samples, sample_rate)
        .map_err(|reason| ApiError::BadRequest(reason.to_string()))?;

    BaselineRepository::insert(&state.pool, device.id, &metrics).await?;
    DeviceRepository::mark_onboarded(&state.pool, device.id).await?;

    info!(
        device = %request.device_id,
        windows = request.samples.len(),
        sdnn = metrics.sdnn,
        rmssd = metrics.rmssd,
        "baseline stored"
    );

    Ok(Json(BaselineResponse {
        success: true,
        message: "Baseline computed and stored successfully".to_string(),
    }))
}
