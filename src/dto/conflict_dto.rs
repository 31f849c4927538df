//! DTOs de Conflict
//!
//! Listado y resolución manual de conflictos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::booking_dto::CallerDto;
use crate::models::conflict::Conflict;

/// Request de resolución manual de un conflicto
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveConflictRequest {
    #[serde(flatten)]
    pub caller: CallerDto,

    #[validate(length(min = 1, max = 500))]
    pub note: String,
}

/// Response de conflicto para la API
#[derive(Debug, Serialize)]
pub struct ConflictResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub conflicting_booking_id: Option<Uuid>,
    pub conflict_type: String,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<Conflict> for ConflictResponse {
    fn from(c: Conflict) -> Self {
        Self {
            id: c.id,
            booking_id: c.booking_id,
            conflicting_booking_id: c.conflicting_booking_id,
            conflict_type: c.conflict_type,
            resolved: c.resolved,
            resolved_by: c.resolved_by,
            resolution_note: c.resolution_note,
            created_at: c.created_at,
            resolved_at: c.resolved_at,
        }
    }
}
