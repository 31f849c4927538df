//! Rutas de la API
//!
//! Un router por recurso, montados bajo /api en main.

pub mod booking_routes;
pub mod conflict_routes;
pub mod vehicle_routes;
