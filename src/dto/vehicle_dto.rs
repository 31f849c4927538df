//! DTOs de Vehicle
//!
//! Superficie de lectura del estado del vehículo y cambio manual de
//! estado (mantenimiento, retirada).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::booking_dto::CallerDto;
use crate::models::vehicle::Vehicle;

/// Request para cambiar el estado de un vehículo
#[derive(Debug, Deserialize)]
pub struct UpdateVehicleStatusRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    /// available | in_use | maintenance | retired
    pub status: String,
}

/// Response de vehículo para la API
#[derive(Debug, Serialize)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub group_id: Uuid,
    pub license_plate: String,
    pub display_name: String,
    pub status: String,
    pub current_odometer: Decimal,
    pub battery_percent: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleResponse {
    fn from(v: Vehicle) -> Self {
        Self {
            id: v.id,
            group_id: v.group_id,
            license_plate: v.license_plate,
            display_name: v.display_name,
            status: v.status,
            current_odometer: v.current_odometer,
            battery_percent: v.battery_percent,
            created_at: v.created_at,
        }
    }
}
