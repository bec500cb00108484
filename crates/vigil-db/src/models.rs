//! Row types returned by the repositories.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A device row as the services see it.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRecord {
    pub id: Uuid,
    pub device_code: String,
    pub onboarded: bool,
    pub user_id: Option<Uuid>,
}

/// A ride row. `status` stays a string at this layer; callers parse it with
/// [`vigil_common::RideStatus::parse`] when they need to branch.
#[derive(Debug, Clone, FromRow)]
pub struct RideRecord {
    pub id: Uuid,
    pub device_id: Uuid,
    pub user_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: String,
}

/// Heart-rate aggregates over a ride's telemetry. All fields are `None`
/// when the ride has no rows with a non-null heart rate.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct HrStats {
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub min_hr: Option<f64>,
    pub total_records: i64,
}

/// Drowsiness-event aggregates over a ride.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct EventStats {
    pub total_drowsiness_events: i64,
    pub total_microsleep_events: i64,
    pub max_drowsiness_score: Option<i32>,
    pub avg_drowsiness_score: Option<f64>,
}

/// Nearest on-duty responder to a crash site.
#[derive(Debug, Clone, FromRow)]
pub struct ResponderMatch {
    pub user_id: Uuid,
    pub facility_name: String,
    pub distance_km: f64,
}

/// Rider identity and medical contact details for crash responses.
#[derive(Debug, Clone, FromRow)]
pub struct RiderInfo {
    pub username: String,
    pub email: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}
