//! Calibration baseline storage. Rows are insert-only; readers always pick
//! the latest per device.

use sqlx::{PgPool, Row};
use uuid::Uuid;
use vigil_hrv::BaselineMetrics;

use crate::DbError;

pub struct BaselineRepository;

impl BaselineRepository {
    /// Latest stored baseline for a device, if it was ever calibrated.
    pub async fn latest_for_device(
        pool: &PgPool,
        device_id: Uuid,
    ) -> Result<Option<BaselineMetrics>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT mean_hr, sdnn, rmssd, pnn50, lf_hf_ratio, sd1_sd2_ratio
            FROM baseline_metrics
            WHERE device_id = $1
            ORDER BY computed_at DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|row| BaselineMetrics {
            mean_hr: row.get("mean_hr"),
            sdnn: row.get("sdnn"),
            rmssd: row.get("rmssd"),
            pnn50: row.get("pnn50"),
            lf_hf_ratio: row.get("lf_hf_ratio"),
            sd1_sd2_ratio: row.get("sd1_sd2_ratio"),
        }))
    }

    /// Store a freshly computed baseline. Never mutates existing rows.
    pub async fn insert(
        pool: &PgPool,
        device_id: Uuid,
        metrics: &BaselineMetrics,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO baseline_metrics
                (device_id, mean_hr, sdnn, rmssd, pnn50, lf_hf_ratio, sd1_sd2_ratio)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(device_id)
        .bind(metrics.mean_hr)
        .bind(metrics.sdnn)
        .bind(metrics.rmssd)
        .bind(metrics.pnn50)
        .bind(metrics.lf_hf_ratio)
        .bind(metrics.sd1_sd2_ratio)
        .execute(pool)
        .await?;
        Ok(())
    }
}
