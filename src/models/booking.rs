//! Modelo de Booking
//!
//! Este módulo contiene el struct Booking, los enums de estado y propósito,
//! y el grafo de transiciones permitidas. Mapea exactamente a la tabla
//! bookings del schema PostgreSQL.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado de la reserva - mapea al ENUM booking_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Conflict,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Conflict => "conflict",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "conflict" => Some(BookingStatus::Conflict),
            _ => None,
        }
    }

    /// Estados terminales: no admiten ninguna transición
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Grafo de transiciones permitidas del ciclo de vida
    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, Conflict)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, Conflict)
                | (InProgress, Completed)
                | (Conflict, Confirmed)
                | (Conflict, Cancelled)
        )
    }
}

/// Estados que retienen el vehículo a efectos de disponibilidad
pub const ACTIVE_STATUSES: [&str; 3] = ["pending", "confirmed", "in_progress"];

/// Tipo de propósito declarado - pesa en el score de prioridad
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PurposeType {
    Business,
    Emergency,
    Family,
    Personal,
    Other,
}

impl PurposeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurposeType::Business => "business",
            PurposeType::Emergency => "emergency",
            PurposeType::Family => "family",
            PurposeType::Personal => "personal",
            PurposeType::Other => "other",
        }
    }

    /// Propósitos desconocidos puntúan como "other"
    pub fn parse(value: &str) -> Self {
        match value {
            "business" => PurposeType::Business,
            "emergency" => PurposeType::Emergency,
            "family" => PurposeType::Family,
            "personal" => PurposeType::Personal,
            _ => PurposeType::Other,
        }
    }
}

/// Booking principal - mapea exactamente a la tabla bookings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
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
    pub reminder_sent: bool,
    pub check_in_odometer: Option<Decimal>,
    pub check_out_odometer: Option<Decimal>,
    pub check_in_battery: Option<i32>,
    pub check_out_battery: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn status_enum(&self) -> Option<BookingStatus> {
        BookingStatus::parse(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_reject_every_transition() {
        use BookingStatus::*;
        let all = [Pending, Confirmed, InProgress, Completed, Cancelled, Conflict];
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in all {
                assert!(
                    !from.can_transition_to(to),
                    "{:?} -> {:?} should be rejected",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_allowed_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Conflict));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Conflict));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Conflict.can_transition_to(Confirmed));
        assert!(Conflict.can_transition_to(Cancelled));
    }

    #[test]
    fn test_disallowed_transitions() {
        use BookingStatus::*;
        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Conflict));
        assert!(!Conflict.can_transition_to(InProgress));
    }

    #[test]
    fn test_status_roundtrip() {
        for s in ["pending", "confirmed", "in_progress", "completed", "cancelled", "conflict"] {
            let parsed = BookingStatus::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!(BookingStatus::parse("unknown").is_none());
    }

    #[test]
    fn test_purpose_parse_falls_back_to_other() {
        assert_eq!(PurposeType::parse("business"), PurposeType::Business);
        assert_eq!(PurposeType::parse("road trip"), PurposeType::Other);
    }
}
