//! Repositorio de Vehicles
//!
//! El vehículo es estado mutable compartido: los cambios de estado y
//! odómetro ocurren dentro de la misma transacción que el cambio de
//! estado de la reserva.

use crate::models::vehicle::Vehicle;
use crate::utils::errors::AppError;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    /// Lectura con lock de fila dentro de una transacción
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Vehicle>, AppError> {
        let vehicle =
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(vehicle)
    }

    pub async fn find_by_group(&self, group_id: Uuid) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE group_id = $1 ORDER BY created_at DESC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    /// Vehículos no retirados, para el warmup de disponibilidad
    pub async fn find_active(&self) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE status <> 'retired' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    /// Cambio de estado + odómetro + batería en la transacción del check
    pub async fn set_usage_state(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: &str,
        odometer: Decimal,
        battery_percent: i32,
    ) -> Result<Vehicle, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET status = $2, current_odometer = $3, battery_percent = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(odometer)
        .bind(battery_percent)
        .fetch_one(conn)
        .await?;

        Ok(vehicle)
    }

    pub async fn set_status(&self, id: Uuid, status: &str) -> Result<Vehicle, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            "UPDATE vehicles SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(vehicle)
    }
}
