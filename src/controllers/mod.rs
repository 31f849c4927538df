//! Controllers
//!
//! Capa fina entre las rutas y los servicios.

pub mod booking_controller;
pub mod check_controller;
pub mod conflict_controller;
pub mod vehicle_controller;
