//! DTOs de Check-in / Check-out
//!
//! Registro de recogida y devolución física del vehículo.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::booking_dto::CallerDto;
use crate::models::check_log::CheckLog;

/// Request de check-in
#[derive(Debug, Deserialize, Validate)]
pub struct CheckInRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    pub odometer: Decimal,

    #[validate(range(min = 0, max = 100))]
    pub battery_percent: i32,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub signature: Option<String>,
}

/// Request de check-out
#[derive(Debug, Deserialize, Validate)]
pub struct CheckOutRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    pub odometer: Decimal,

    #[validate(range(min = 0, max = 100))]
    pub battery_percent: i32,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub signature: Option<String>,
}

/// Response de un registro de check
#[derive(Debug, Serialize)]
pub struct CheckLogResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub action: String,
    pub odometer: Decimal,
    pub battery_percent: i32,
    pub notes: Option<String>,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<CheckLog> for CheckLogResponse {
    fn from(l: CheckLog) -> Self {
        Self {
            id: l.id,
            booking_id: l.booking_id,
            action: l.action,
            odometer: l.odometer,
            battery_percent: l.battery_percent,
            notes: l.notes,
            performed_by: l.performed_by,
            created_at: l.created_at,
        }
    }
}

/// Estadísticas de uso derivadas al completar el check-out
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub distance_km: Decimal,
    pub duration_hours: Decimal,
    pub energy_consumed_percent: i32,
    pub cost: Decimal,
}
