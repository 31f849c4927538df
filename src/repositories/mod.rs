//! Repositorios
//!
//! Acceso SQL por agregado. Las lecturas usan el pool; las escrituras de
//! workflows multi-statement reciben la conexión de la transacción.

pub mod booking_repository;
pub mod check_log_repository;
pub mod conflict_repository;
pub mod vehicle_repository;
