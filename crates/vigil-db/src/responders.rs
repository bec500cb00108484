//! Responder routing and crash alerts.

use sqlx::{PgPool, Row};
use uuid::Uuid;
use vigil_common::CrashSeverity;

use crate::models::{ResponderMatch, RiderInfo};
use crate::DbError;

pub struct ResponderRepository;

impl ResponderRepository {
    /// Nearest on-duty responder to a crash site.
    ///
    /// Great-circle distance via the haversine formula evaluated in SQL, so
    /// this stays a single delegated lookup with no extension requirement.
    pub async fn nearest_on_duty(
        pool: &PgPool,
        lat: f64,
        lon: f64,
    ) -> Result<Option<ResponderMatch>, DbError> {
        let responder = sqlx::query_as::<_, ResponderMatch>(
            r#"
            SELECT
                u.id AS user_id,
                rp.facility_name,
                2.0 * 6371.0 * asin(sqrt(
                    pow(sin(radians(rp.lat - $1) / 2.0), 2)
                    + cos(radians($1)) * cos(radians(rp.lat))
                      * pow(sin(radians(rp.lon - $2) / 2.0), 2)
                )) AS distance_km
            FROM responder_profiles rp
            JOIN users u ON u.id = rp.user_id
            WHERE rp.on_duty = TRUE
            ORDER BY distance_km ASC
            LIMIT 1
            "#,
        )
        .bind(lat)
        .bind(lon)
        .fetch_optional(pool)
        .await?;
        Ok(responder)
    }

    /// Rider identity and medical details for the crash response.
    pub async fn rider_info(pool: &PgPool, user_id: Uuid) -> Result<Option<RiderInfo>, DbError> {
        let info = sqlx::query_as::<_, RiderInfo>(
            r#"
            SELECT u.username, u.email, p.blood_type, p.allergies,
                   p.emergency_contact_name, p.emergency_contact_phone
            FROM users u
            LEFT JOIN rider_profiles p ON p.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(info)
    }

    /// Record the crash, with or without a routed responder.
    pub async fn insert_crash_alert(
        pool: &PgPool,
        device_id: Uuid,
        lat: Option<f64>,
        lon: Option<f64>,
        severity: CrashSeverity,
        notified_responder_id: Option<Uuid>,
        distance_km: Option<f64>,
    ) -> Result<Uuid, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO crash_alerts
                (device_id, lat, lon, severity, responder_notified,
                 notified_responder_id, distance_km, notification_sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            RETURNING id
            "#,
        )
        .bind(device_id)
        .bind(lat)
        .bind(lon)
        .bind(severity.as_str())
        .bind(notified_responder_id.is_some())
        .bind(notified_responder_id)
        .bind(distance_km)
        .fetch_one(pool)
        .await?;
        Ok(row.get("id"))
    }
}
