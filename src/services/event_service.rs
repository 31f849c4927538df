//! Publicador de eventos de ciclo de vida
//!
//! Publish fire-and-forget sobre un canal Redis. Los fallos se reintentan
//! un número fijo de veces, se loguean y se descartan: publicar un evento
//! nunca bloquea ni hace fallar al caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::redis_client::RedisClient;

const PUBLISH_ATTEMPTS: u32 = 3;

/// Tipos de evento emitidos por el motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    BookingCreated,
    BookingUpdated,
    BookingConfirmed,
    BookingCancelled,
    ConflictDetected,
    ConflictResolved,
    CheckIn,
    CheckOut,
    BookingReminder,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BookingCreated => "booking_created",
            EventKind::BookingUpdated => "booking_updated",
            EventKind::BookingConfirmed => "booking_confirmed",
            EventKind::BookingCancelled => "booking_cancelled",
            EventKind::ConflictDetected => "conflict_detected",
            EventKind::ConflictResolved => "conflict_resolved",
            EventKind::CheckIn => "check_in",
            EventKind::CheckOut => "check_out",
            EventKind::BookingReminder => "booking_reminder",
        }
    }
}

/// Payload de un evento de ciclo de vida
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub event: &'static str,
    pub booking_id: Uuid,
    pub vehicle_id: Uuid,
    pub group_id: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct EventPublisher {
    redis: RedisClient,
    channel: String,
}

impl EventPublisher {
    pub fn new(redis: RedisClient, channel: String) -> Self {
        Self { redis, channel }
    }

    /// Publicar un evento. Nunca devuelve error: tras agotar los
    /// reintentos el evento se descarta con un log.
    pub async fn publish(&self, kind: EventKind, booking_id: Uuid, vehicle_id: Uuid, group_id: Uuid, at: DateTime<Utc>) {
        let event = LifecycleEvent {
            event: kind.as_str(),
            booking_id,
            vehicle_id,
            group_id,
            at,
        };

        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                log::error!("❌ Evento no serializable ({}): {}", event.event, e);
                return;
            }
        };

        for attempt in 1..=PUBLISH_ATTEMPTS {
            match self.redis.publish(&self.channel, &payload).await {
                Ok(()) => return,
                Err(e) if attempt < PUBLISH_ATTEMPTS => {
                    log::warn!(
                        "⚠️ Publish de {} falló (intento {}/{}): {}",
                        event.event,
                        attempt,
                        PUBLISH_ATTEMPTS,
                        e
                    );
                }
                Err(e) => {
                    log::error!(
                        "❌ Evento {} descartado tras {} intentos: {}",
                        event.event,
                        PUBLISH_ATTEMPTS,
                        e
                    );
                }
            }
        }
    }
}
