//! Ride lifecycle queries.
//!
//! The status column is only ever moved forward (`active → ending →
//! completed`), and both transition points are conditional updates so
//! concurrent callers cannot double-apply them.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{HrStats, RideRecord};
use crate::DbError;

/// Result of the atomic finalisation in [`RideRepository::complete_with_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// This call performed the `ending → completed` transition.
    Completed,
    /// Another worker already completed the ride; idempotent success.
    AlreadyCompleted,
    /// The ride is in a state the aggregator must not touch (e.g. still
    /// `active`); the job is discarded rather than retried.
    InvalidState(String),
    NotFound,
}

/// Aggregates written during finalisation.
#[derive(Debug, Clone)]
pub struct RideCompletion {
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i32,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub min_hr: Option<f64>,
    pub fatigue_score: i32,
    pub total_drowsiness_events: i64,
    pub total_microsleep_events: i64,
    pub max_drowsiness_score: Option<i32>,
    pub avg_drowsiness_score: Option<f64>,
}

pub struct RideRepository;

impl RideRepository {
    pub async fn find(pool: &PgPool, ride_id: Uuid) -> Result<Option<RideRecord>, DbError> {
        let ride = sqlx::query_as::<_, RideRecord>(
            r#"
            SELECT id, device_id, user_id, start_time, end_time, status
            FROM rides
            WHERE id = $1
            "#,
        )
        .bind(ride_id)
        .fetch_optional(pool)
        .await?;
        Ok(ride)
    }

    /// The open ride for a device, if any. The partial unique index
    /// guarantees at most one row qualifies.
    pub async fn active_ride_for_device(
        pool: &PgPool,
        device_id: Uuid,
    ) -> Result<Option<Uuid>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT id FROM rides
            WHERE device_id = $1 AND status = 'active'
            ORDER BY start_time DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|row| row.get("id")))
    }

    /// Open a new ride in `active` state.
    pub async fn create(
        pool: &PgPool,
        device_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Uuid, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO rides (device_id, user_id, start_time, status)
            VALUES ($1, $2, now(), 'active')
            RETURNING id
            "#,
        )
        .bind(device_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(row.get("id"))
    }

    /// Conditionally move an `active` ride to `ending`.
    ///
    /// Returns `false` when no row was affected, i.e. the ride does not
    /// exist or is already past `active`; the caller re-fetches to find out
    /// which.
    pub async fn mark_ending(pool: &PgPool, ride_id: Uuid) -> Result<bool, DbError> {
        let row = sqlx::query(
            r#"
            UPDATE rides
            SET status = 'ending'
            WHERE id = $1 AND status = 'active'
            RETURNING id
            "#,
        )
        .bind(ride_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    /// Heart-rate aggregates over the ride's persisted telemetry.
    pub async fn hr_stats(pool: &PgPool, ride_id: Uuid) -> Result<HrStats, DbError> {
        let stats = sqlx::query_as::<_, HrStats>(
            r#"
            SELECT
                AVG(hr) AS avg_hr,
                MAX(hr) AS max_hr,
                MIN(hr) AS min_hr,
                COUNT(*) AS total_records
            FROM raw_ppg_telemetry
            WHERE ride_id = $1 AND hr IS NOT NULL
            "#,
        )
        .bind(ride_id)
        .fetch_one(pool)
        .await?;
        Ok(stats)
    }

    /// Atomic finalisation: row lock, status re-check, conditional update
    /// and summary upsert in one transaction.
    ///
    /// The `FOR UPDATE` lock serialises concurrent aggregator instances;
    /// whichever loses the race observes `completed` and returns the
    /// idempotent outcome.
    pub async fn complete_with_summary(
        pool: &PgPool,
        ride_id: Uuid,
        completion: &RideCompletion,
    ) -> Result<CompletionOutcome, DbError> {
        let mut tx = pool.begin().await?;

        let row = sqlx::query("SELECT status FROM rides WHERE id = $1 FOR UPDATE")
            .bind(ride_id)
            .fetch_optional(&mut *tx)
            .await?;

        let status: String = match row {
            Some(row) => row.get("status"),
            None => return Ok(CompletionOutcome::NotFound),
        };

        if status == "completed" {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }
        if status != "ending" {
            return Ok(CompletionOutcome::InvalidState(status));
        }

        sqlx::query(
            r#"
            UPDATE rides
            SET end_time = $2,
                duration_seconds = $3,
                avg_hr = $4,
                max_hr = $5,
                min_hr = $6,
                status = 'completed'
            WHERE id = $1 AND status = 'ending'
            "#,
        )
        .bind(ride_id)
        .bind(completion.end_time)
        .bind(completion.duration_seconds)
        .bind(completion.avg_hr)
        .bind(completion.max_hr)
        .bind(completion.min_hr)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ride_summaries
                (ride_id, fatigue_score, total_drowsiness_events, total_microsleep_events,
                 max_drowsiness_score, avg_drowsiness_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (ride_id) DO UPDATE SET
                fatigue_score = EXCLUDED.fatigue_score,
                total_drowsiness_events = EXCLUDED.total_drowsiness_events,
                total_microsleep_events = EXCLUDED.total_microsleep_events,
                max_drowsiness_score = EXCLUDED.max_drowsiness_score,
                avg_drowsiness_score = EXCLUDED.avg_drowsiness_score,
                computed_at = now()
            "#,
        )
        .bind(ride_id)
        .bind(completion.fatigue_score)
        .bind(completion.total_drowsiness_events as i32)
        .bind(completion.total_microsleep_events as i32)
        .bind(completion.max_drowsiness_score)
        .bind(completion.avg_drowsiness_score)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CompletionOutcome::Completed)
    }
}
