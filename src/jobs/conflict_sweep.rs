//! Job de barrido de conflictos
//!
//! Re-escanea los Conflict sin resolver más antiguos que el umbral de
//! staleness y aplica la resolución automática determinista del
//! ConflictService. Los tipos sin regla quedan logueados para resolución
//! manual.

use crate::state::AppState;

pub async fn run(state: AppState) -> anyhow::Result<String> {
    let detector = state.conflict_service();
    let summary = detector.sweep_stale_conflicts().await?;

    Ok(format!(
        "{} escaneados, {} resueltos ({} reservas canceladas), {} para manual",
        summary.scanned, summary.resolved, summary.cancelled_bookings, summary.left_for_manual
    ))
}
