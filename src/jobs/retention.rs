//! Job de retención de datos
//!
//! Borra reservas terminales más antiguas que la ventana de retención.
//! Los registros dependientes (check logs y conflictos) se borran de forma
//! explícita dentro de la misma transacción que la reserva padre, sin
//! depender de cascadas del datastore.

use chrono::Duration;

use crate::repositories::booking_repository::BookingRepository;
use crate::repositories::check_log_repository::CheckLogRepository;
use crate::repositories::conflict_repository::ConflictRepository;
use crate::state::AppState;

const BATCH_SIZE: i64 = 200;

pub async fn run(state: AppState) -> anyhow::Result<String> {
    let bookings = BookingRepository::new(state.pool.clone());
    let conflicts = ConflictRepository::new(state.pool.clone());
    let check_logs = CheckLogRepository::new(state.pool.clone());

    let now = state.clock.now();
    let cutoff = now - Duration::days(state.policy.retention_days);

    let candidates = bookings.find_retention_candidates(cutoff, BATCH_SIZE).await?;
    let total = candidates.len();
    let mut deleted = 0;

    for booking_id in candidates {
        let result = async {
            let mut tx = state.pool.begin().await?;
            check_logs.delete_by_booking(&mut tx, booking_id).await?;
            conflicts.delete_by_booking(&mut tx, booking_id).await?;
            bookings.delete(&mut tx, booking_id).await?;
            tx.commit().await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        match result {
            Ok(()) => deleted += 1,
            Err(e) => log::error!(
                "❌ Retención falló para reserva {}: {}",
                booking_id,
                e
            ),
        }
    }

    Ok(format!("{}/{} reservas purgadas", deleted, total))
}
