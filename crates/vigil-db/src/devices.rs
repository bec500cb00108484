//! Device lookups and bookkeeping.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DeviceRecord;
use crate::DbError;

pub struct DeviceRepository;

impl DeviceRepository {
    /// Resolve a device by its stable external code.
    pub async fn find_by_code(
        pool: &PgPool,
        device_code: &str,
    ) -> Result<Option<DeviceRecord>, DbError> {
        let device = sqlx::query_as::<_, DeviceRecord>(
            r#"
            SELECT id, device_code, onboarded, user_id
            FROM devices
            WHERE device_code = $1
            "#,
        )
        .bind(device_code)
        .fetch_optional(pool)
        .await?;
        Ok(device)
    }

    /// Stamp the device as recently heard from.
    pub async fn update_last_seen(pool: &PgPool, device_id: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE devices SET last_seen = now() WHERE id = $1")
            .bind(device_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Flip the onboarded flag after a successful calibration.
    pub async fn mark_onboarded(pool: &PgPool, device_id: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE devices SET onboarded = TRUE WHERE id = $1")
            .bind(device_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
