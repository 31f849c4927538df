//! Modelo de Conflict
//!
//! Conflictos detectados sobre reservas: solapamiento temporal, vehículo
//! no disponible, cuota excedida, mantenimiento o restricción de grupo.
//! Un conflicto solo muta al resolverse (manual o automáticamente).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tipo de conflicto - mapea a la columna conflict_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    TimeOverlap,
    VehicleUnavailable,
    QuotaExceeded,
    Maintenance,
    GroupRestriction,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::TimeOverlap => "time_overlap",
            ConflictType::VehicleUnavailable => "vehicle_unavailable",
            ConflictType::QuotaExceeded => "quota_exceeded",
            ConflictType::Maintenance => "maintenance",
            ConflictType::GroupRestriction => "group_restriction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "time_overlap" => Some(ConflictType::TimeOverlap),
            "vehicle_unavailable" => Some(ConflictType::VehicleUnavailable),
            "quota_exceeded" => Some(ConflictType::QuotaExceeded),
            "maintenance" => Some(ConflictType::Maintenance),
            "group_restriction" => Some(ConflictType::GroupRestriction),
            _ => None,
        }
    }
}

/// Conflict - mapea exactamente a la tabla booking_conflicts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conflict {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub conflicting_booking_id: Option<Uuid>,
    pub conflict_type: String,
    pub resolved: bool,
    // "system" para el caller interno, uuid del usuario en resolución manual
    pub resolved_by: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_type_roundtrip() {
        for t in [
            "time_overlap",
            "vehicle_unavailable",
            "quota_exceeded",
            "maintenance",
            "group_restriction",
        ] {
            assert_eq!(ConflictType::parse(t).unwrap().as_str(), t);
        }
        assert!(ConflictType::parse("unknown").is_none());
    }
}
