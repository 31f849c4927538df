//! Jobs en background
//!
//! Tareas periódicas que mantienen el sistema auto-reparable: envío de
//! recordatorios, barrido de conflictos stale, warmup de la cache de
//! disponibilidad y limpieza de retención. Cada job corre bajo un lock
//! distribuido con TTL: como máximo una ejecución concurrente por tipo de
//! job en toda la flota de procesos.

pub mod cache_warmup;
pub mod conflict_sweep;
pub mod reminders;
pub mod retention;
pub mod scheduler;

use crate::state::AppState;

// Intervalos de ejecución (segundos)
const REMINDERS_INTERVAL_SECS: u64 = 300;
const CONFLICT_SWEEP_INTERVAL_SECS: u64 = 3600;
const CACHE_WARMUP_INTERVAL_SECS: u64 = 600;
const RETENTION_INTERVAL_SECS: u64 = 86_400;

/// Lanzar todos los jobs periódicos
pub fn spawn_background_jobs(state: AppState) {
    scheduler::spawn_job(state.clone(), "reminders", REMINDERS_INTERVAL_SECS, |s| {
        Box::pin(reminders::run(s))
    });
    scheduler::spawn_job(
        state.clone(),
        "conflict_sweep",
        CONFLICT_SWEEP_INTERVAL_SECS,
        |s| Box::pin(conflict_sweep::run(s)),
    );
    scheduler::spawn_job(
        state.clone(),
        "cache_warmup",
        CACHE_WARMUP_INTERVAL_SECS,
        |s| Box::pin(cache_warmup::run(s)),
    );
    scheduler::spawn_job(state, "retention", RETENTION_INTERVAL_SECS, |s| {
        Box::pin(retention::run(s))
    });
}
