//! Telemetry batch persistence and drowsiness event logging.

use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, warn};
use uuid::Uuid;
use vigil_common::rpc::{
    DrowsinessEventRequest, DrowsinessEventResponse, TelemetryBatchRequest, TelemetryBatchResponse,
};
use vigil_db::{DeviceRepository, TelemetryRepository};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/telemetry/batch", post(save_telemetry_batch))
        .route("/drowsiness-events", post(log_drowsiness_event))
}

/// Persist one flushed telemetry buffer in a single transaction.
#[utoipa::path(
    post,
    path = "/telemetry/batch",
    request_body = TelemetryBatchRequest,
    responses(
        (status = 200, description = "Batch stored", body = TelemetryBatchResponse),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn save_telemetry_batch(
    State(state): State<AppState>,
    Json(batch): Json<TelemetryBatchRequest>,
) -> ApiResult<Json<TelemetryBatchResponse>> {
    let device = DeviceRepository::find_by_code(&state.pool, &batch.device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    // A malformed ride reference degrades to unattached persistence rather
    // than losing the batch.
    let ride_id = match batch.ride_id.as_deref() {
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(device = %batch.device_id, ride_id = raw, "malformed ride id on batch; storing unattached");
                None
            }
        },
        None => None,
    };

    let records_inserted =
        TelemetryRepository::insert_batch(&state.pool, device.id, ride_id, &batch.telemetry)
            .await?;
    DeviceRepository::update_last_seen(&state.pool, device.id).await?;

    info!(device = %batch.device_id, records_inserted, "telemetry batch stored");

    Ok(Json(TelemetryBatchResponse {
        success: true,
        records_inserted,
        device_id: batch.device_id,
    }))
}

/// Record one non-awake classification with a server-side timestamp.
#[utoipa::path(
    post,
    path = "/drowsiness-events",
    request_body = DrowsinessEventRequest,
    responses(
        (status = 200, description = "Event stored", body = DrowsinessEventResponse),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn log_drowsiness_event(
    State(state): State<AppState>,
    Json(event): Json<DrowsinessEventRequest>,
) -> ApiResult<Json<DrowsinessEventResponse>> {
    let device = DeviceRepository::find_by_code(&state.pool, &event.device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    let event_id = TelemetryRepository::insert_drowsiness_event(&state.pool, device.id, &event)
        .await?;

    Ok(Json(DrowsinessEventResponse {
        success: true,
        event_id,
    }))
}
