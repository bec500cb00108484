//! Coordinator HTTP contract
//!
//! Request/response bodies exchanged between the stream processor and the
//! ride coordinator. Kept here so both sides compile against one shape.
//! OpenAPI schema derives are gated behind the `openapi` feature so the
//! stream processor does not drag documentation machinery in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CrashSeverity, DrowsinessStatus};

/// One processed telemetry record, buffered in the stream processor and
/// persisted in a batch. `ride_id` attachment happens at batch level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TelemetryPoint {
    pub timestamp: DateTime<Utc>,
    pub hr: f64,
    pub ibi_ms: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
    pub lf_hf_ratio: f64,
    #[serde(default)]
    pub accel_x: Option<f64>,
    #[serde(default)]
    pub accel_y: Option<f64>,
    #[serde(default)]
    pub accel_z: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// `POST /rides/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StartRideRequest {
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StartRideResponse {
    pub ride_id: Uuid,
    pub message: String,
}

/// `POST /rides/{ride_id}/end`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EndRideResponse {
    pub success: bool,
    pub ride_id: Uuid,
    pub message: String,
}

/// `POST /telemetry/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TelemetryBatchRequest {
    pub device_id: String,
    /// Ride attachment; malformed ids degrade to unattached persistence.
    #[serde(default)]
    pub ride_id: Option<String>,
    pub telemetry: Vec<TelemetryPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TelemetryBatchResponse {
    pub success: bool,
    pub records_inserted: usize,
    pub device_id: String,
}

/// `POST /drowsiness-events`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DrowsinessEventRequest {
    pub device_id: String,
    pub ride_id: Uuid,
    pub severity_score: i32,
    pub status: DrowsinessStatus,
    pub hr_at_event: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
    pub lf_hf_ratio: f64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DrowsinessEventResponse {
    pub success: bool,
    pub event_id: Uuid,
}

/// `POST /crash`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CrashAlertRequest {
    pub device_id: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    pub severity: CrashSeverity,
    #[serde(default)]
    pub accel_magnitude: Option<f64>,
    #[serde(default)]
    pub accel_x: Option<f64>,
    #[serde(default)]
    pub accel_y: Option<f64>,
    #[serde(default)]
    pub accel_z: Option<f64>,
}

/// `POST /baseline`: calibration from raw PPG windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BaselineRequest {
    pub device_id: String,
    /// One or more raw PPG windows captured at rest.
    pub samples: Vec<Vec<f64>>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BaselineResponse {
    pub success: bool,
    pub message: String,
}

// Re-exported here so the crash route and the stream client share the shape.
pub use crate::wire::CrashReport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_request_tolerates_missing_ride() {
        let json = r#"{"device_id":"H1","telemetry":[]}"#;
        let req: TelemetryBatchRequest = serde_json::from_str(json).unwrap();
        assert!(req.ride_id.is_none());
        assert!(req.telemetry.is_empty());
    }

    #[test]
    fn event_request_uses_wire_status_labels() {
        let json = r#"{
            "device_id":"H1",
            "ride_id":"5a8c1c4e-8a2f-4e6b-9a64-0d6f6a1b2c3d",
            "severity_score":9,
            "status":"DROWSY",
            "hr_at_event":71.0,
            "sdnn":25.0,
            "rmssd":18.0,
            "pnn50":8.0,
            "lf_hf_ratio":2.6
        }"#;
        let req: DrowsinessEventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.status, DrowsinessStatus::Drowsy);
        assert!(req.lat.is_none());
    }
}
