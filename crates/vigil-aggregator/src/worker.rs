//! Ride finalisation logic.
//!
//! One job, one ride: resolve the authoritative end time, aggregate
//! heart-rate and drowsiness statistics, then let the repository perform
//! the locked, conditional completion. Everything that is not a transient
//! failure ends in an acknowledgement so the queue never loops.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use vigil_common::{RideEndJob, RideStatus};
use vigil_db::{
    CompletionOutcome, RideCompletion, RideRepository, TelemetryRepository,
};

/// Result of processing one job, as the consume loop sees it.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Finalised, already finalised, or discarded as a no-op; acknowledge.
    Success,
    /// The ride is in a state this worker must not touch; acknowledge
    /// without retry to avoid a poison loop.
    InvalidState,
    /// Transient failure; eligible for a bounded requeue.
    Failed(anyhow::Error),
}

/// What the consume loop should do with the delivery.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    AckDiscard,
    Republish { next_retry: u32 },
}

/// Map a processing outcome and the message's requeue-hop count onto an
/// ack/republish decision.
pub fn disposition_for(outcome: &ProcessOutcome, retry_count: u32, max_retries: u32) -> Disposition {
    match outcome {
        ProcessOutcome::Success => Disposition::Ack,
        ProcessOutcome::InvalidState => Disposition::AckDiscard,
        ProcessOutcome::Failed(_) => {
            if retry_count >= max_retries {
                Disposition::AckDiscard
            } else {
                Disposition::Republish {
                    next_retry: retry_count + 1,
                }
            }
        }
    }
}

/// End-time precedence: message, then ride row, then the worker's clock.
fn resolve_end_time(
    from_message: Option<DateTime<Utc>>,
    from_ride: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    from_message.or(from_ride).unwrap_or_else(Utc::now)
}

/// `min(100, 10·drowsiness + 20·microsleep)`.
fn fatigue_score(drowsiness_events: i64, microsleep_events: i64) -> i32 {
    (drowsiness_events * 10 + microsleep_events * 20).min(100) as i32
}

/// Process one `ride.end` job end to end.
pub async fn process_ride(pool: &PgPool, job: &RideEndJob) -> ProcessOutcome {
    let ride = match RideRepository::find(pool, job.ride_id).await {
        Ok(Some(ride)) => ride,
        Ok(None) => {
            warn!(ride_id = %job.ride_id, "ride not found; discarding job");
            return ProcessOutcome::Success;
        }
        Err(error) => return ProcessOutcome::Failed(error.into()),
    };

    match RideStatus::parse(&ride.status) {
        Some(RideStatus::Completed) => {
            info!(ride_id = %job.ride_id, "ride already completed");
            return ProcessOutcome::Success;
        }
        Some(RideStatus::Ending) => {}
        _ => {
            warn!(ride_id = %job.ride_id, status = %ride.status, "invalid ride status; discarding job");
            return ProcessOutcome::InvalidState;
        }
    }

    let end_time = resolve_end_time(job.end_time, ride.end_time);
    let duration_seconds = (end_time - ride.start_time).num_seconds().max(0) as i32;

    let hr_stats = match RideRepository::hr_stats(pool, job.ride_id).await {
        Ok(stats) => stats,
        Err(error) => return ProcessOutcome::Failed(error.into()),
    };
    let event_stats = match TelemetryRepository::event_stats(pool, job.ride_id).await {
        Ok(stats) => stats,
        Err(error) => return ProcessOutcome::Failed(error.into()),
    };

    let completion = RideCompletion {
        end_time,
        duration_seconds,
        avg_hr: hr_stats.avg_hr,
        max_hr: hr_stats.max_hr,
        min_hr: hr_stats.min_hr,
        fatigue_score: fatigue_score(
            event_stats.total_drowsiness_events,
            event_stats.total_microsleep_events,
        ),
        total_drowsiness_events: event_stats.total_drowsiness_events,
        total_microsleep_events: event_stats.total_microsleep_events,
        max_drowsiness_score: event_stats.max_drowsiness_score,
        avg_drowsiness_score: event_stats.avg_drowsiness_score,
    };

    match RideRepository::complete_with_summary(pool, job.ride_id, &completion).await {
        Ok(CompletionOutcome::Completed) => {
            info!(
                ride_id = %job.ride_id,
                duration_seconds,
                fatigue = completion.fatigue_score,
                avg_hr = ?completion.avg_hr,
                "ride completed"
            );
            ProcessOutcome::Success
        }
        Ok(CompletionOutcome::AlreadyCompleted) => {
            info!(ride_id = %job.ride_id, "ride completed by a concurrent worker");
            ProcessOutcome::Success
        }
        Ok(CompletionOutcome::NotFound) => {
            warn!(ride_id = %job.ride_id, "ride vanished during completion; discarding job");
            ProcessOutcome::Success
        }
        Ok(CompletionOutcome::InvalidState(status)) => {
            warn!(ride_id = %job.ride_id, %status, "invalid state during completion; discarding job");
            ProcessOutcome::InvalidState
        }
        Err(error) => ProcessOutcome::Failed(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fatigue_score_weights_and_caps() {
        assert_eq!(fatigue_score(0, 0), 0);
        assert_eq!(fatigue_score(3, 2), 70);
        assert_eq!(fatigue_score(8, 1), 100);
        assert_eq!(fatigue_score(50, 50), 100);
    }

    #[test]
    fn fatigue_score_stays_in_range() {
        for drowsy in 0..30 {
            for micro in 0..30 {
                let score = fatigue_score(drowsy, micro);
                assert!((0..=100).contains(&score), "score {score} out of range");
            }
        }
    }

    #[test]
    fn end_time_prefers_message_then_ride_then_now() {
        let message_time = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let ride_time = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        assert_eq!(
            resolve_end_time(Some(message_time), Some(ride_time)),
            message_time
        );
        assert_eq!(resolve_end_time(None, Some(ride_time)), ride_time);

        let before = Utc::now();
        let resolved = resolve_end_time(None, None);
        assert!(resolved >= before);
    }

    #[test]
    fn failed_jobs_republish_until_the_retry_budget_is_spent() {
        let failed = ProcessOutcome::Failed(anyhow::anyhow!("db down"));

        assert_eq!(
            disposition_for(&failed, 0, 3),
            Disposition::Republish { next_retry: 1 }
        );
        assert_eq!(
            disposition_for(&failed, 2, 3),
            Disposition::Republish { next_retry: 3 }
        );
        // At the threshold the job is poison: acknowledged and dropped.
        assert_eq!(disposition_for(&failed, 3, 3), Disposition::AckDiscard);
        assert_eq!(disposition_for(&failed, 7, 3), Disposition::AckDiscard);
    }

    #[test]
    fn terminal_outcomes_are_acknowledged_without_retry() {
        assert_eq!(disposition_for(&ProcessOutcome::Success, 0, 3), Disposition::Ack);
        assert_eq!(
            disposition_for(&ProcessOutcome::InvalidState, 0, 3),
            Disposition::AckDiscard
        );
        // Even at zero retries a success is a plain ack.
        assert_eq!(disposition_for(&ProcessOutcome::Success, 9, 3), Disposition::Ack);
    }
}
