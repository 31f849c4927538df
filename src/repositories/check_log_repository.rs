//! Repositorio de Check Logs
//!
//! Registro append-only: inserciones y lecturas, sin updates.

use crate::models::check_log::CheckLog;
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Datos de un registro de check nuevo
pub struct NewCheckLog {
    pub booking_id: Uuid,
    pub action: String,
    pub odometer: Decimal,
    pub battery_percent: i32,
    pub notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub performed_by: Uuid,
    pub signature: Option<String>,
}

pub struct CheckLogRepository {
    pool: PgPool,
}

impl CheckLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        new: &NewCheckLog,
        now: DateTime<Utc>,
    ) -> Result<CheckLog, AppError> {
        let log = sqlx::query_as::<_, CheckLog>(
            r#"
            INSERT INTO check_logs (
                id, booking_id, action, odometer, battery_percent, notes,
                latitude, longitude, performed_by, signature, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.booking_id)
        .bind(&new.action)
        .bind(new.odometer)
        .bind(new.battery_percent)
        .bind(&new.notes)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.performed_by)
        .bind(&new.signature)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(log)
    }

    pub async fn find_by_booking_and_action(
        &self,
        booking_id: Uuid,
        action: &str,
    ) -> Result<Option<CheckLog>, AppError> {
        let log = sqlx::query_as::<_, CheckLog>(
            "SELECT * FROM check_logs WHERE booking_id = $1 AND action = $2",
        )
        .bind(booking_id)
        .bind(action)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    pub async fn find_by_booking(&self, booking_id: Uuid) -> Result<Vec<CheckLog>, AppError> {
        let logs = sqlx::query_as::<_, CheckLog>(
            "SELECT * FROM check_logs WHERE booking_id = $1 ORDER BY created_at ASC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    pub async fn delete_by_booking(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM check_logs WHERE booking_id = $1")
            .bind(booking_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }
}
