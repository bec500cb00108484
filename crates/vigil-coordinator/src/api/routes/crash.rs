//! Crash handling: responder routing, alert persistence and rider contact
//! enrichment.

use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, warn};
use vigil_common::rpc::{CrashAlertRequest, CrashReport};
use vigil_common::wire::RiderContact;
use vigil_db::{DeviceRepository, ResponderRepository};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/crash", post(crash_alert))
}

/// Route a detected impact to the nearest on-duty responder.
///
/// The alert row is written whether or not a responder is found; an
/// unrouted crash is still an immutable record of the impact.
#[utoipa::path(
    post,
    path = "/crash",
    request_body = CrashAlertRequest,
    responses(
        (status = 200, description = "Crash recorded, responder routed when available", body = CrashReport),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn crash_alert(
    State(state): State<AppState>,
    Json(alert): Json<CrashAlertRequest>,
) -> ApiResult<Json<CrashReport>> {
    let device = DeviceRepository::find_by_code(&state.pool, &alert.device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    let responder = match (alert.lat, alert.lon) {
        (Some(lat), Some(lon)) => ResponderRepository::nearest_on_duty(&state.pool, lat, lon).await?,
        _ => {
            warn!(device = %alert.device_id, "crash without GPS fix; cannot route responder");
            None
        }
    };

    let rider = match device.user_id {
        Some(user_id) => ResponderRepository::rider_info(&state.pool, user_id)
            .await?
            .map(|info| RiderContact {
                username: info.username,
                email: info.email,
                blood_type: info.blood_type,
                allergies: info.allergies,
                emergency_contact_name: info.emergency_contact_name,
                emergency_contact_phone: info.emergency_contact_phone,
            }),
        None => None,
    };

    let crash_id = ResponderRepository::insert_crash_alert(
        &state.pool,
        device.id,
        alert.lat,
        alert.lon,
        alert.severity,
        responder.as_ref().map(|r| r.user_id),
        responder.as_ref().map(|r| r.distance_km),
    )
    .await?;

    info!(
        device = %alert.device_id,
        severity = %alert.severity,
        responder = responder.as_ref().map(|r| r.facility_name.as_str()).unwrap_or("none"),
        "crash alert recorded"
    );

    Ok(Json(CrashReport {
        success: true,
        crash_id,
        severity: alert.severity,
        responder_notified: responder.is_some(),
        responder_name: responder.as_ref().map(|r| r.facility_name.clone()),
        distance_km: responder.as_ref().map(|r| r.distance_km),
        rider,
    }))
}
