//! Repositorio de Bookings
//!
//! Acceso SQL a la tabla bookings. Las lecturas generales usan el pool;
//! las escrituras que forman parte de un workflow multi-statement reciben
//! la conexión de la transacción abierta por el servicio.

use crate::models::booking::Booking;
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Datos de una reserva nueva, ya validada y puntuada
pub struct NewBooking {
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub purpose: String,
    pub purpose_type: String,
    pub destination: Option<String>,
    pub estimated_distance_km: Option<Decimal>,
    pub priority_score: i32,
    pub auto_confirmed: bool,
}

/// Campos editables de una reserva existente
pub struct BookingChanges {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub purpose: String,
    pub purpose_type: String,
    pub destination: Option<String>,
    pub estimated_distance_km: Option<Decimal>,
}

pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        new: &NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, vehicle_id, user_id, group_id, start_time, end_time, status,
                purpose, purpose_type, destination, estimated_distance_km,
                priority_score, auto_confirmed, reminder_sent, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, false, $14, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.vehicle_id)
        .bind(new.user_id)
        .bind(new.group_id)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(&new.status)
        .bind(&new.purpose)
        .bind(&new.purpose_type)
        .bind(&new.destination)
        .bind(new.estimated_distance_km)
        .bind(new.priority_score)
        .bind(new.auto_confirmed)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    /// Lectura con lock de fila dentro de una transacción
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Booking>, AppError> {
        let booking =
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(booking)
    }

    pub async fn find_by_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY start_time DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Reservas activas del mismo vehículo que solapan el rango [start, end).
    /// Semántica de intervalos semiabiertos: a1 < b2 AND b1 < a2.
    pub async fn find_overlapping(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booking: Option<Uuid>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE vehicle_id = $1
              AND status IN ('pending', 'confirmed', 'in_progress')
              AND start_time < $3
              AND end_time > $2
              AND ($4::uuid IS NULL OR id <> $4)
            ORDER BY start_time ASC
            "#,
        )
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .bind(exclude_booking)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Todas las reservas no canceladas del vehículo que tocan el rango
    pub async fn find_in_range(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE vehicle_id = $1
              AND status <> 'cancelled'
              AND start_time < $3
              AND end_time > $2
            ORDER BY start_time ASC
            "#,
        )
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    pub async fn find_group_in_range(
        &self,
        group_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE group_id = $1
              AND status <> 'cancelled'
              AND start_time < $3
              AND end_time > $2
            ORDER BY start_time ASC
            "#,
        )
        .bind(group_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Cuota diaria: reservas pending/confirmed que empiezan dentro del día
    /// natural [day_start, day_end)
    pub async fn count_starting_in_day(
        &self,
        user_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE user_id = $1
              AND status IN ('pending', 'confirmed')
              AND start_time >= $2
              AND start_time < $3
            "#,
        )
        .bind(user_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Cuota de activas: pending/confirmed/in_progress con fin en el futuro
    pub async fn count_active(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE user_id = $1
              AND status IN ('pending', 'confirmed', 'in_progress')
              AND end_time > $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Horas de uso del usuario en el grupo en los últimos 30 días, a partir
    /// de las reservas completadas
    pub async fn usage_hours_since(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<f64, AppError> {
        let row: (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT SUM(EXTRACT(EPOCH FROM (end_time - start_time)) / 3600.0)::float8
            FROM bookings
            WHERE user_id = $1
              AND group_id = $2
              AND status = 'completed'
              AND end_time >= $3
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0.unwrap_or(0.0))
    }

    pub async fn update_fields(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        changes: &BookingChanges,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET start_time = $2, end_time = $3, purpose = $4, purpose_type = $5,
                destination = $6, estimated_distance_km = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.start_time)
        .bind(changes.end_time)
        .bind(&changes.purpose)
        .bind(&changes.purpose_type)
        .bind(&changes.destination)
        .bind(changes.estimated_distance_km)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    pub async fn cancel(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'cancelled', cancellation_reason = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    pub async fn extend(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        new_end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET end_time = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_end_time)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    /// Snapshot de check-in sobre la reserva
    pub async fn record_check_in(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        odometer: Decimal,
        battery_percent: i32,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'in_progress', check_in_odometer = $2, check_in_battery = $3,
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(odometer)
        .bind(battery_percent)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    /// Snapshot de check-out sobre la reserva
    pub async fn record_check_out(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        odometer: Decimal,
        battery_percent: i32,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'completed', check_out_odometer = $2, check_out_battery = $3,
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(odometer)
        .bind(battery_percent)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    /// Persistir las estadísticas de uso derivadas tras el check-out
    pub async fn record_usage_stats(
        &self,
        id: Uuid,
        actual_distance_km: Decimal,
        cost: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET actual_distance_km = $2, cost = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(actual_distance_km)
        .bind(cost)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reservas confirmadas que empiezan pronto y aún no tienen recordatorio
    pub async fn find_reminder_due(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE status = 'confirmed'
              AND reminder_sent = false
              AND start_time >= $1
              AND start_time <= $2
            ORDER BY start_time ASC
            "#,
        )
        .bind(now)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    pub async fn mark_reminder_sent(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE bookings SET reminder_sent = true, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Reservas terminales antiguas, candidatas a retención
    pub async fn find_retention_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM bookings
            WHERE status IN ('completed', 'cancelled')
              AND end_time < $1
            ORDER BY end_time ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Borrado del booking padre; los dependientes se borran antes,
    /// explícitamente, dentro de la misma transacción
    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }
}
