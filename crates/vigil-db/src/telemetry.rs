//! Telemetry batches and drowsiness events. Both tables are append-only.

use sqlx::{PgPool, Row};
use uuid::Uuid;
use vigil_common::rpc::{DrowsinessEventRequest, TelemetryPoint};

use crate::models::EventStats;
use crate::DbError;

pub struct TelemetryRepository;

impl TelemetryRepository {
    /// Insert a flushed buffer in one transaction, preserving capture order.
    ///
    /// `ride_id` is the already-validated attachment; unattached points are
    /// persisted with a NULL ride reference. Returns the number of rows
    /// written, which equals the buffer length on success.
    pub async fn insert_batch(
        pool: &PgPool,
        device_id: Uuid,
        ride_id: Option<Uuid>,
        points: &[TelemetryPoint],
    ) -> Result<usize, DbError> {
        let mut tx = pool.begin().await?;

        for point in points {
            sqlx::query(
                r#"
                INSERT INTO raw_ppg_telemetry
                    (device_id, ride_id, timestamp, hr, ibi_ms, sdnn, rmssd, pnn50,
                     lf_hf_ratio, accel_x, accel_y, accel_z, lat, lon)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(device_id)
            .bind(ride_id)
            .bind(point.timestamp)
            .bind(point.hr)
            .bind(point.ibi_ms)
            .bind(point.sdnn)
            .bind(point.rmssd)
            .bind(point.pnn50)
            .bind(point.lf_hf_ratio)
            .bind(point.accel_x)
            .bind(point.accel_y)
            .bind(point.accel_z)
            .bind(point.lat)
            .bind(point.lon)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(points.len())
    }

    /// Insert one drowsiness event with a server-side detection timestamp.
    pub async fn insert_drowsiness_event(
        pool: &PgPool,
        device_id: Uuid,
        event: &DrowsinessEventRequest,
    ) -> Result<Uuid, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO drowsiness_events
                (ride_id, device_id, detected_at, severity_score, status, hr_at_event,
                 sdnn, rmssd, pnn50, lf_hf_ratio, lat, lon)
            VALUES ($1, $2, now(), $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(event.ride_id)
        .bind(device_id)
        .bind(event.severity_score)
        .bind(event.status.label())
        .bind(event.hr_at_event)
        .bind(event.sdnn)
        .bind(event.rmssd)
        .bind(event.pnn50)
        .bind(event.lf_hf_ratio)
        .bind(event.lat)
        .bind(event.lon)
        .fetch_one(pool)
        .await?;
        Ok(row.get("id"))
    }

    /// Event aggregates consumed by the ride aggregator.
    pub async fn event_stats(pool: &PgPool, ride_id: Uuid) -> Result<EventStats, DbError> {
        let stats = sqlx::query_as::<_, EventStats>(
            r#"
            SELECT
                COALESCE(COUNT(*) FILTER (WHERE status IN ('DROWSY', 'MICROSLEEP')), 0)
                    AS total_drowsiness_events,
                COALESCE(COUNT(*) FILTER (WHERE status = 'MICROSLEEP'), 0)
                    AS total_microsleep_events,
                MAX(severity_score) AS max_drowsiness_score,
                AVG(severity_score)::double precision AS avg_drowsiness_score
            FROM drowsiness_events
            WHERE ride_id = $1
            "#,
        )
        .bind(ride_id)
        .fetch_one(pool)
        .await?;
        Ok(stats)
    }
}
