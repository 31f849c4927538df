//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar.

pub mod booking;
pub mod caller;
pub mod check_log;
pub mod conflict;
pub mod membership;
pub mod vehicle;
