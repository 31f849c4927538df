//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas. Cada error lleva
//! un código estable legible por máquina, separado del mensaje humano.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Una violación individual de una regla de validación
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleViolation {
    pub field: String,
    pub rule: String,
    pub message: String,
}

impl RuleViolation {
    pub fn new(field: &str, rule: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            rule: rule.to_string(),
            message: message.into(),
        }
    }
}

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validación de reglas de negocio: siempre lleva la lista completa
    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<RuleViolation>),

    #[error("Booking conflict: {message}")]
    Conflict {
        message: String,
        conflicting_booking_id: Option<Uuid>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    /// Operación inválida para el estado actual del booking
    #[error("Invalid state: {0}")]
    State(String),

    /// Fallo de un servicio externo (cache, membership, eventos)
    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Database(e) => {
                log::error!("❌ Error de base de datos: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database Error".to_string(),
                        message: "An error occurred while accessing the database".to_string(),
                        details: Some(json!({ "sql_error": e.to_string() })),
                        code: "DB_ERROR".to_string(),
                    },
                )
            }

            AppError::Validation(violations) => {
                log::warn!("⚠️ Validación fallida: {} violaciones", violations.len());
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Validation Error".to_string(),
                        message: "The booking request violates one or more rules".to_string(),
                        details: Some(json!({ "violations": violations })),
                        code: "VALIDATION_ERROR".to_string(),
                    },
                )
            }

            AppError::Conflict { message, conflicting_booking_id } => {
                log::warn!("⚠️ Conflicto de reserva: {}", message);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Booking Conflict".to_string(),
                        message,
                        details: conflicting_booking_id
                            .map(|id| json!({ "conflicting_booking_id": id })),
                        code: "BOOKING_CONFLICT".to_string(),
                    },
                )
            }

            AppError::NotFound(msg) => {
                log::warn!("❌ Recurso no encontrado: {}", msg);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse {
                        error: "Not Found".to_string(),
                        message: msg,
                        details: None,
                        code: "NOT_FOUND".to_string(),
                    },
                )
            }

            AppError::Permission(msg) => {
                log::warn!("🚫 Permiso denegado: {}", msg);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse {
                        error: "Permission Denied".to_string(),
                        message: msg,
                        details: None,
                        code: "PERMISSION_DENIED".to_string(),
                    },
                )
            }

            AppError::State(msg) => {
                log::warn!("⚠️ Transición de estado inválida: {}", msg);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Invalid State".to_string(),
                        message: msg,
                        details: None,
                        code: "INVALID_STATE".to_string(),
                    },
                )
            }

            AppError::Dependency(msg) => {
                log::error!("❌ Fallo de dependencia externa: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: "Dependency Error".to_string(),
                        message: "An external dependency is unavailable".to_string(),
                        details: Some(json!({ "dependency_error": msg })),
                        code: "DEPENDENCY_ERROR".to_string(),
                    },
                )
            }

            AppError::Internal(msg) => {
                log::error!("❌ Error interno: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: Some(json!({ "internal_error": msg })),
                        code: "INTERNAL_ERROR".to_string(),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let violations = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| RuleViolation {
                    field: field.to_string(),
                    rule: e.code.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value for '{}'", field)),
                })
            })
            .collect();
        AppError::Validation(violations)
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &Uuid) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de estado inválido
pub fn state_error(operation: &str, current_status: &str) -> AppError {
    AppError::State(format!(
        "Cannot {} a booking in status '{}'",
        operation, current_status
    ))
}

/// Función helper para crear errores de permiso
pub fn permission_error(operation: &str) -> AppError {
    AppError::Permission(format!("Caller is not allowed to {}", operation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_keeps_all_violations() {
        let violations = vec![
            RuleViolation::new("start_time", "future", "start time must be in the future"),
            RuleViolation::new("end_time", "after_start", "end time must be after start time"),
        ];
        let err = AppError::Validation(violations.clone());
        match err {
            AppError::Validation(v) => assert_eq!(v.len(), 2),
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn test_conflict_error_carries_booking_id() {
        let id = Uuid::new_v4();
        let err = AppError::Conflict {
            message: "vehicle already booked".to_string(),
            conflicting_booking_id: Some(id),
        };
        match err {
            AppError::Conflict { conflicting_booking_id, .. } => {
                assert_eq!(conflicting_booking_id, Some(id));
            }
            _ => panic!("expected conflict error"),
        }
    }
}
