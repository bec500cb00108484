//! Broker payload shapes
//!
//! Inbound payloads tolerate missing optional fields; outbound payloads are
//! produced exactly as the mobile app and firmware expect them. All payloads
//! are UTF-8 JSON objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CrashSeverity, DrowsinessStatus};

fn default_sample_rate() -> u32 {
    50
}

fn default_accel_z() -> f64 {
    9.8
}

/// Raw PPG telemetry published by a helmet on `helmet/<id>/telemetry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub ppg: Vec<f64>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Tri-axis accelerometer sample published on `helmet/<id>/accel`.
///
/// The z axis defaults to rest gravity so a device that omits it does not
/// read as a free fall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelMessage {
    #[serde(default)]
    pub accel_x: f64,
    #[serde(default)]
    pub accel_y: f64,
    #[serde(default = "default_accel_z")]
    pub accel_z: f64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// GPS fix attached to outbound analysis and crash payloads.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Metrics block embedded in a live-analysis payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub hr: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
    pub lf_hf_ratio: f64,
    pub drowsiness_score: u8,
}

/// Per-cycle analysis result published on `helmet/<id>/live-analysis` (QoS 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveAnalysis {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: DrowsinessStatus,
    pub metrics: LiveMetrics,
    pub location: GeoPoint,
}

/// Actuator command published on `helmet/<id>/command` (QoS 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    pub vibrate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<CrashSeverity>,
}

impl CommandMessage {
    /// Routine feedback command: vibrate on any non-awake classification.
    pub fn feedback(vibrate: bool) -> Self {
        Self {
            vibrate,
            crash_detected: Some(false),
            severity: None,
        }
    }

    /// Emergency command sent when an impact is detected.
    pub fn crash(severity: CrashSeverity) -> Self {
        Self {
            vibrate: true,
            crash_detected: Some(true),
            severity: Some(severity),
        }
    }
}

/// Accelerometer snapshot embedded in a crash payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelSnapshot {
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub magnitude: f64,
    pub max_axis_deviation: f64,
}

/// Rider medical/contact details attached to a crash report when known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RiderContact {
    pub username: String,
    pub email: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// Coordinator response to a crash report, also embedded in the crash topic
/// payload so the mobile app sees which responder was routed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CrashReport {
    pub success: bool,
    pub crash_id: uuid::Uuid,
    pub severity: CrashSeverity,
    pub responder_notified: bool,
    pub responder_name: Option<String>,
    pub distance_km: Option<f64>,
    pub rider: Option<RiderContact>,
}

/// Crash notification published on `helmet/<id>/crash` (QoS 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashMessage {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: CrashSeverity,
    pub location: GeoPoint,
    pub accel: AccelSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<CrashReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_defaults_apply() {
        let msg: TelemetryMessage = serde_json::from_str(r#"{"ppg":[1.0,2.0,3.0]}"#).unwrap();
        assert_eq!(msg.sample_rate, 50);
        assert!(msg.lat.is_none());
        assert!(msg.lon.is_none());
    }

    #[test]
    fn accel_defaults_to_rest_gravity() {
        let msg: AccelMessage = serde_json::from_str(r#"{"accel_x":1.5}"#).unwrap();
        assert_eq!(msg.accel_x, 1.5);
        assert_eq!(msg.accel_y, 0.0);
        assert_eq!(msg.accel_z, 9.8);
    }

    #[test]
    fn feedback_command_never_reports_crash() {
        let cmd = CommandMessage::feedback(true);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["vibrate"], true);
        assert_eq!(json["crash_detected"], false);
        assert!(json.get("severity").is_none());
    }

    #[test]
    fn crash_command_carries_severity() {
        let cmd = CommandMessage::crash(CrashSeverity::Severe);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["vibrate"], true);
        assert_eq!(json["crash_detected"], true);
        assert_eq!(json["severity"], "severe");
    }
}
