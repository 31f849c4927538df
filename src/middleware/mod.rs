//! Middleware
//!
//! Capa de middleware HTTP del servicio.

pub mod cors;
