//! Ride lifecycle endpoints: the only writers of `rides.status`.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;
use vigil_common::rpc::{EndRideResponse, StartRideRequest, StartRideResponse};
use vigil_common::{RideEndJob, RideStatus};
use vigil_db::{DeviceRepository, RideRepository};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rides/start", post(start_ride))
        .route("/rides/:ride_id/end", post(end_ride))
}

/// Open a ride for a device, or return the one already open.
#[utoipa::path(
    post,
    path = "/rides/start",
    request_body = StartRideRequest,
    responses(
        (status = 200, description = "Ride started or already active", body = StartRideResponse),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn start_ride(
    State(state): State<AppState>,
    Json(request): Json<StartRideRequest>,
) -> ApiResult<Json<StartRideResponse>> {
    let device = DeviceRepository::find_by_code(&state.pool, &request.device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    if let Some(ride_id) = RideRepository::active_ride_for_device(&state.pool, device.id).await? {
        return Ok(Json(StartRideResponse {
            ride_id,
            message: "Ride already active".to_string(),
        }));
    }

    let ride_id = RideRepository::create(&state.pool, device.id, device.user_id).await?;
    info!(device = %request.device_id, %ride_id, "ride started");

    Ok(Json(StartRideResponse {
        ride_id,
        message: "Ride started successfully".to_string(),
    }))
}

/// End a ride asynchronously.
///
/// Marks the ride `ending` with a conditional update, then publishes a
/// durable `ride.end` job carrying the end time captured *before* any
/// asynchronous step. At-most-one caller wins the transition; everyone else
/// gets an idempotent response.
#[utoipa::path(
    post,
    path = "/rides/{ride_id}/end",
    params(("ride_id" = Uuid, Path, description = "Ride identifier")),
    responses(
        (status = 200, description = "Queued, already in progress, or already completed", body = EndRideResponse),
        (status = 400, description = "Ride is in a state that cannot be ended"),
        (status = 404, description = "Unknown ride"),
        (status = 500, description = "Queue publish failed; ride remains in 'ending'")
    )
)]
pub async fn end_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> ApiResult<Json<EndRideResponse>> {
    // Captured before the conditional update and the publish.
    let end_time = Utc::now();

    let marked = RideRepository::mark_ending(&state.pool, ride_id).await?;
    if !marked {
        let ride = RideRepository::find(&state.pool, ride_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Ride not found".to_string()))?;

        return match RideStatus::parse(&ride.status) {
            Some(RideStatus::Ending) => Ok(Json(EndRideResponse {
                success: true,
                ride_id,
                message: "Ride end already in progress".to_string(),
            })),
            Some(RideStatus::Completed) => Ok(Json(EndRideResponse {
                success: true,
                ride_id,
                message: "Ride already completed".to_string(),
            })),
            _ => Err(ApiError::BadRequest(format!(
                "Cannot end ride with status: {}",
                ride.status
            ))),
        };
    }

    let job = RideEndJob {
        ride_id,
        end_time: Some(end_time),
    };
    if let Err(publish_error) = state.publish_ride_end(&job).await {
        // The ride stays in 'ending'; the operator reconciles. A
        // transactional outbox would close this gap.
        error!(%ride_id, %publish_error, "failed to publish ride.end");
        return Err(ApiError::Internal(
            "Failed to queue ride completion".to_string(),
        ));
    }

    info!(%ride_id, end_time = %end_time.to_rfc3339(), "ride end queued");

    Ok(Json(EndRideResponse {
        success: true,
        ride_id,
        message: "Ride end queued for processing".to_string(),
    }))
}
