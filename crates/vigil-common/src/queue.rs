//! Work-queue contract between the coordinator and the aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable topic carrying ride-completion jobs.
pub const RIDE_END_TOPIC: &str = "ride.end";

/// Message property counting requeue hops. Parsed as an integer; absent
/// means zero.
pub const RETRY_COUNT_PROPERTY: &str = "x-retry-count";

/// Job enqueued by the coordinator when a ride enters `ending`.
///
/// `end_time` is the caller's clock captured before the publish, so the
/// aggregator finalises with the time the ride actually ended rather than
/// the time the job was processed. The coordinator always sets it; the
/// aggregator tolerates its absence and falls back to the ride row, then to
/// its own clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideEndJob {
    pub ride_id: Uuid,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_round_trips_as_json() {
        let job = RideEndJob {
            ride_id: Uuid::new_v4(),
            end_time: Some(Utc::now()),
        };
        let json = serde_json::to_string(&job).unwrap();
        let back: RideEndJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ride_id, job.ride_id);
        assert_eq!(back.end_time, job.end_time);
    }

    #[test]
    fn job_accepts_iso8601_end_time() {
        let json = r#"{"ride_id":"5a8c1c4e-8a2f-4e6b-9a64-0d6f6a1b2c3d","end_time":"2026-03-01T08:30:00Z"}"#;
        let job: RideEndJob = serde_json::from_str(json).unwrap();
        assert_eq!(
            job.end_time.unwrap().to_rfc3339(),
            "2026-03-01T08:30:00+00:00"
        );
    }

    #[test]
    fn job_tolerates_missing_end_time() {
        let json = r#"{"ride_id":"5a8c1c4e-8a2f-4e6b-9a64-0d6f6a1b2c3d"}"#;
        let job: RideEndJob = serde_json::from_str(json).unwrap();
        assert!(job.end_time.is_none());
    }
}
