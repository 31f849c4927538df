//! DTOs de Booking
//!
//! Requests y responses del ciclo de vida de reservas. La identidad del
//! caller llega explícita en el request: la capa de autenticación vive
//! fuera de este servicio.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::booking::Booking;
use crate::models::caller::{CallerContext, UserRole};

/// Identidad del caller embebida en los requests
#[derive(Debug, Clone, Deserialize)]
pub struct CallerDto {
    pub user_id: Uuid,
    pub role: Option<String>,
}

impl CallerDto {
    pub fn to_context(&self) -> CallerContext {
        CallerContext::User {
            id: self.user_id,
            role: self
                .role
                .as_deref()
                .map(UserRole::parse)
                .unwrap_or(UserRole::Member),
        }
    }
}

/// Request para crear una reserva
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    pub vehicle_id: Uuid,
    pub group_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    pub purpose: String,

    /// business | emergency | family | personal | other
    pub purpose_type: Option<String>,

    #[validate(length(max = 200))]
    pub destination: Option<String>,

    pub estimated_distance_km: Option<Decimal>,
}

/// Request para actualizar una reserva existente
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    pub purpose: Option<String>,

    pub purpose_type: Option<String>,

    #[validate(length(max = 200))]
    pub destination: Option<String>,

    pub estimated_distance_km: Option<Decimal>,
}

/// Request para cancelar una reserva
#[derive(Debug, Deserialize, Validate)]
pub struct CancelBookingRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Request para extender una reserva en curso
#[derive(Debug, Deserialize)]
pub struct ExtendBookingRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    pub new_end_time: DateTime<Utc>,
}

/// Request para confirmar manualmente una reserva
#[derive(Debug, Deserialize)]
pub struct ConfirmBookingRequest {
    #[serde(flatten)]
    pub caller: CallerDto,
}

/// Query de disponibilidad puntual
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub vehicle_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Query de calendario
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Response de reserva para la API
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
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
    pub actual_distance_km: Option<Decimal>,
    pub priority_score: i32,
    pub cost: Option<Decimal>,
    pub cancellation_reason: Option<String>,
    pub auto_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            vehicle_id: b.vehicle_id,
            user_id: b.user_id,
            group_id: b.group_id,
            start_time: b.start_time,
            end_time: b.end_time,
            status: b.status,
            purpose: b.purpose,
            purpose_type: b.purpose_type,
            destination: b.destination,
            estimated_distance_km: b.estimated_distance_km,
            actual_distance_km: b.actual_distance_km,
            priority_score: b.priority_score,
            cost: b.cost,
            cancellation_reason: b.cancellation_reason,
            auto_confirmed: b.auto_confirmed,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}
