//! Job de recordatorios
//!
//! Publica un evento de recordatorio por cada reserva confirmada que
//! empieza dentro de la ventana de antelación y aún no fue avisada. El
//! flag reminder_sent hace el job idempotente entre ejecuciones e
//! instancias.

use chrono::Duration;

use crate::repositories::booking_repository::BookingRepository;
use crate::services::event_service::EventKind;
use crate::state::AppState;

pub async fn run(state: AppState) -> anyhow::Result<String> {
    let bookings = BookingRepository::new(state.pool.clone());
    let events = state.event_publisher();

    let now = state.clock.now();
    let until = now + Duration::minutes(state.policy.reminder_lead_minutes);

    let due = bookings.find_reminder_due(now, until).await?;
    let total = due.len();
    let mut sent = 0;

    for booking in due {
        events
            .publish(
                EventKind::BookingReminder,
                booking.id,
                booking.vehicle_id,
                booking.group_id,
                now,
            )
            .await;

        match bookings.mark_reminder_sent(booking.id, now).await {
            Ok(()) => sent += 1,
            Err(e) => log::error!(
                "❌ No se pudo marcar el recordatorio de {}: {}",
                booking.id,
                e
            ),
        }
    }

    Ok(format!("{}/{} recordatorios enviados", sent, total))
}
