//! Modelo de Check-in/Check-out Log
//!
//! Registro append-only de recogidas y devoluciones físicas del vehículo.
//! Como máximo un check_in y un check_out por reserva.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Acción registrada
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckAction {
    CheckIn,
    CheckOut,
}

impl CheckAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckAction::CheckIn => "check_in",
            CheckAction::CheckOut => "check_out",
        }
    }
}

/// CheckLog - mapea exactamente a la tabla check_logs
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckLog {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub action: String,
    pub odometer: Decimal,
    pub battery_percent: i32,
    pub notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub performed_by: Uuid,
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
}
