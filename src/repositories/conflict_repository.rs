//! Repositorio de Conflicts
//!
//! Acceso SQL a la tabla booking_conflicts. Los conflictos solo mutan al
//! resolverse; el resto de columnas es inmutable tras la inserción.

use crate::models::conflict::Conflict;
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct ConflictRepository {
    pool: PgPool,
}

impl ConflictRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
        conflicting_booking_id: Option<Uuid>,
        conflict_type: &str,
        now: DateTime<Utc>,
    ) -> Result<Conflict, AppError> {
        let conflict = sqlx::query_as::<_, Conflict>(
            r#"
            INSERT INTO booking_conflicts (
                id, booking_id, conflicting_booking_id, conflict_type,
                resolved, created_at
            )
            VALUES ($1, $2, $3, $4, false, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(conflicting_booking_id)
        .bind(conflict_type)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(conflict)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Conflict>, AppError> {
        let conflict =
            sqlx::query_as::<_, Conflict>("SELECT * FROM booking_conflicts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conflict)
    }

    pub async fn find_unresolved(&self, limit: i64) -> Result<Vec<Conflict>, AppError> {
        let conflicts = sqlx::query_as::<_, Conflict>(
            r#"
            SELECT * FROM booking_conflicts
            WHERE resolved = false
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(conflicts)
    }

    /// Conflictos sin resolver más antiguos que el umbral de staleness
    pub async fn find_stale_unresolved(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Conflict>, AppError> {
        let conflicts = sqlx::query_as::<_, Conflict>(
            r#"
            SELECT * FROM booking_conflicts
            WHERE resolved = false
              AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(conflicts)
    }

    pub async fn resolve(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        resolved_by: &str,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<Conflict, AppError> {
        let conflict = sqlx::query_as::<_, Conflict>(
            r#"
            UPDATE booking_conflicts
            SET resolved = true, resolved_by = $2, resolution_note = $3, resolved_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(resolved_by)
        .bind(note)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(conflict)
    }

    /// Resolución masiva de todos los conflictos abiertos que referencian
    /// una reserva (en cancelación)
    pub async fn resolve_all_for_booking(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
        resolved_by: &str,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE booking_conflicts
            SET resolved = true, resolved_by = $2, resolution_note = $3, resolved_at = $4
            WHERE resolved = false
              AND (booking_id = $1 OR conflicting_booking_id = $1)
            "#,
        )
        .bind(booking_id)
        .bind(resolved_by)
        .bind(note)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_by_booking(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM booking_conflicts WHERE booking_id = $1 OR conflicting_booking_id = $1",
        )
        .bind(booking_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
