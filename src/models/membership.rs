//! Modelos del servicio externo de membresías
//!
//! Respuestas del servicio de ownership por grupo. El servicio se trata
//! como flaky: cualquier fallo degrada a valores por defecto seguros.

use serde::{Deserialize, Serialize};

/// Membresía de un usuario en un grupo de co-propiedad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub ownership_percent: f64,
    pub active: bool,
    pub is_admin: bool,
}

/// Restricciones de reserva definidas por el grupo
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupRules {
    /// Duración máxima permitida por el grupo (horas)
    pub max_duration_hours: Option<i64>,
    /// Ventana horaria permitida para iniciar reservas [start_hour, end_hour)
    pub allowed_start_hour: Option<u32>,
    pub allowed_end_hour: Option<u32>,
}
