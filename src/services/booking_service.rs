//! Gestor del ciclo de vida de reservas
//!
//! Orquesta create/update/cancel/extend como unidades transaccionales
//! compuestas de validación, scoring, disponibilidad y persistencia.
//! Los efectos post-commit (detección de conflictos, invalidación de
//! cache, eventos) son una lista ordenada y explícita, cada uno con su
//! propio catch: su fallo nunca revierte un write ya commiteado.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::booking::BookingPolicy;
use crate::dto::booking_dto::{
    CancelBookingRequest, CreateBookingRequest, ExtendBookingRequest, UpdateBookingRequest,
};
use crate::models::booking::{Booking, BookingStatus, PurposeType};
use crate::models::caller::CallerContext;
use crate::repositories::booking_repository::{
    BookingChanges, BookingRepository, NewBooking,
};
use crate::repositories::conflict_repository::ConflictRepository;
use crate::services::availability_service::AvailabilityService;
use crate::services::conflict_service::ConflictService;
use crate::services::event_service::{EventKind, EventPublisher};
use crate::services::priority_service::PriorityService;
use crate::services::validation_service::ValidationService;
use crate::utils::clock::SharedClock;
use crate::utils::errors::{
    not_found_error, permission_error, state_error, AppError, AppResult, RuleViolation,
};

/// Efecto post-commit, ejecutado en orden tras la transacción
enum PostCommitEffect {
    DetectConflicts,
    InvalidateCache,
    Emit(EventKind),
}

pub struct BookingService {
    pool: PgPool,
    policy: BookingPolicy,
    bookings: BookingRepository,
    conflicts: ConflictRepository,
    validation: ValidationService,
    priority: PriorityService,
    availability: AvailabilityService,
    detector: ConflictService,
    events: EventPublisher,
    clock: SharedClock,
}

impl BookingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        policy: BookingPolicy,
        validation: ValidationService,
        priority: PriorityService,
        availability: AvailabilityService,
        detector: ConflictService,
        events: EventPublisher,
        clock: SharedClock,
    ) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            conflicts: ConflictRepository::new(pool.clone()),
            pool,
            policy,
            validation,
            priority,
            availability,
            detector,
            events,
            clock,
        }
    }

    pub async fn get_booking(&self, id: Uuid) -> AppResult<Booking> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &id))
    }

    pub async fn list_user_bookings(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Booking>> {
        self.bookings.find_by_user(user_id, limit).await
    }

    /// Crear una reserva: validación → scoring → transacción → efectos.
    /// Con score >= umbral la reserva entra directamente confirmada.
    pub async fn create_booking(
        &self,
        caller: CallerContext,
        req: &CreateBookingRequest,
    ) -> AppResult<Booking> {
        if !caller.is_user(&req.caller.user_id) && !caller.is_elevated() {
            return Err(permission_error("create bookings for another user"));
        }

        self.validation
            .validate_new_booking(
                req.caller.user_id,
                req.start_time,
                req.end_time,
                &req.purpose,
            )
            .await?;

        let purpose_type = PurposeType::parse(req.purpose_type.as_deref().unwrap_or("other"));
        let score = self
            .priority
            .score_booking(
                req.caller.user_id,
                req.group_id,
                req.start_time,
                purpose_type,
            )
            .await;

        let auto_confirmed = score >= self.policy.auto_confirm_threshold;
        let status = if auto_confirmed {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };

        let now = self.clock.now();
        let new = NewBooking {
            vehicle_id: req.vehicle_id,
            user_id: req.caller.user_id,
            group_id: req.group_id,
            start_time: req.start_time,
            end_time: req.end_time,
            status: status.as_str().to_string(),
            purpose: req.purpose.clone(),
            purpose_type: purpose_type.as_str().to_string(),
            destination: req.destination.clone(),
            estimated_distance_km: req.estimated_distance_km,
            priority_score: score,
            auto_confirmed,
        };

        let mut tx = self.pool.begin().await?;
        let booking = self.bookings.insert(&mut tx, &new, now).await?;
        tx.commit().await?;

        log::info!(
            "📅 Reserva {} creada ({}, score {})",
            booking.id,
            booking.status,
            score
        );

        let mut effects = vec![
            PostCommitEffect::DetectConflicts,
            PostCommitEffect::InvalidateCache,
            PostCommitEffect::Emit(EventKind::BookingCreated),
        ];
        if auto_confirmed {
            effects.push(PostCommitEffect::Emit(EventKind::BookingConfirmed));
        }
        self.run_post_commit(&booking, &effects).await;

        // Devolver el estado más fresco: la detección puede haberla marcado
        Ok(self.bookings.find_by_id(booking.id).await?.unwrap_or(booking))
    }

    /// Actualizar campos de una reserva pending/confirmed. Si cambia el
    /// horario se re-valida y se re-chequea la disponibilidad.
    pub async fn update_booking(
        &self,
        booking_id: Uuid,
        caller: CallerContext,
        req: &UpdateBookingRequest,
    ) -> AppResult<Booking> {
        let booking = self.get_booking(booking_id).await?;

        if !caller.is_user(&booking.user_id) && !caller.is_elevated() {
            return Err(permission_error("update this booking"));
        }

        let status = booking
            .status_enum()
            .ok_or_else(|| AppError::Internal(format!("unknown status '{}'", booking.status)))?;
        if !matches!(status, BookingStatus::Pending | BookingStatus::Confirmed) {
            return Err(state_error("update", &booking.status));
        }

        let new_start = req.start_time.unwrap_or(booking.start_time);
        let new_end = req.end_time.unwrap_or(booking.end_time);
        let new_purpose = req.purpose.clone().unwrap_or_else(|| booking.purpose.clone());
        let time_changed = new_start != booking.start_time || new_end != booking.end_time;

        if time_changed || req.purpose.is_some() {
            self.validation
                .validate_updated_fields(new_start, new_end, &new_purpose)?;
        }

        if time_changed {
            let availability = self
                .availability
                .check_availability(booking.vehicle_id, new_start, new_end, Some(booking.id))
                .await?;
            if !availability.available {
                return Err(AppError::Conflict {
                    message: availability
                        .reason
                        .unwrap_or_else(|| "vehicle not available".to_string()),
                    conflicting_booking_id: availability.conflicting_booking_id,
                });
            }
        }

        let purpose_type = match &req.purpose_type {
            Some(pt) => PurposeType::parse(pt).as_str().to_string(),
            None => booking.purpose_type.clone(),
        };
        let changes = BookingChanges {
            start_time: new_start,
            end_time: new_end,
            purpose: new_purpose,
            purpose_type,
            destination: req.destination.clone().or_else(|| booking.destination.clone()),
            estimated_distance_km: req.estimated_distance_km.or(booking.estimated_distance_km),
        };

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let updated = self
            .bookings
            .update_fields(&mut tx, booking_id, &changes, now)
            .await?;
        tx.commit().await?;

        log::info!("✏️ Reserva {} actualizada", booking_id);

        let mut effects = Vec::new();
        if time_changed {
            effects.push(PostCommitEffect::DetectConflicts);
        }
        effects.push(PostCommitEffect::InvalidateCache);
        effects.push(PostCommitEffect::Emit(EventKind::BookingUpdated));
        self.run_post_commit(&updated, &effects).await;

        Ok(self.bookings.find_by_id(booking_id).await?.unwrap_or(updated))
    }

    /// Cancelar una reserva pending/confirmed. Los conflictos abiertos que
    /// la referencian se resuelven en bloque dentro de la misma transacción.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        caller: CallerContext,
        req: &CancelBookingRequest,
    ) -> AppResult<Booking> {
        let booking = self.get_booking(booking_id).await?;

        if !caller.is_user(&booking.user_id) && !caller.is_elevated() {
            return Err(permission_error("cancel this booking"));
        }

        let status = booking
            .status_enum()
            .ok_or_else(|| AppError::Internal(format!("unknown status '{}'", booking.status)))?;
        if !matches!(status, BookingStatus::Pending | BookingStatus::Confirmed) {
            return Err(state_error("cancel", &booking.status));
        }

        let now = self.clock.now();
        let reason = req.reason.as_deref().unwrap_or("cancelled by user");
        let auto_note = format!("booking {} cancelled; conflict closed automatically", booking_id);

        let mut tx = self.pool.begin().await?;
        let cancelled = self
            .bookings
            .cancel(&mut tx, booking_id, Some(reason), now)
            .await?;
        let resolved = self
            .conflicts
            .resolve_all_for_booking(&mut tx, booking_id, &caller.label(), &auto_note, now)
            .await?;
        tx.commit().await?;

        log::info!(
            "🚫 Reserva {} cancelada ({} conflictos auto-resueltos)",
            booking_id,
            resolved
        );

        let mut effects = vec![
            PostCommitEffect::InvalidateCache,
            PostCommitEffect::Emit(EventKind::BookingCancelled),
        ];
        if resolved > 0 {
            effects.push(PostCommitEffect::Emit(EventKind::ConflictResolved));
        }
        self.run_post_commit(&cancelled, &effects).await;

        Ok(cancelled)
    }

    /// Extender una reserva en curso. El nuevo fin debe superar al actual
    /// como máximo en el tope configurado, y la ventana extra debe estar
    /// libre.
    pub async fn extend_booking(
        &self,
        booking_id: Uuid,
        caller: CallerContext,
        req: &ExtendBookingRequest,
    ) -> AppResult<Booking> {
        let booking = self.get_booking(booking_id).await?;

        if !caller.is_user(&booking.user_id) && !caller.is_elevated() {
            return Err(permission_error("extend this booking"));
        }

        if booking.status != BookingStatus::InProgress.as_str() {
            return Err(state_error("extend", &booking.status));
        }

        let violations = validate_extension(
            &self.policy,
            booking.end_time,
            req.new_end_time,
        );
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        // La ventana delta [fin actual, fin nuevo) debe estar disponible
        let availability = self
            .availability
            .check_availability(
                booking.vehicle_id,
                booking.end_time,
                req.new_end_time,
                Some(booking.id),
            )
            .await?;
        if !availability.available {
            return Err(AppError::Conflict {
                message: availability
                    .reason
                    .unwrap_or_else(|| "vehicle not available for extension".to_string()),
                conflicting_booking_id: availability.conflicting_booking_id,
            });
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let extended = self
            .bookings
            .extend(&mut tx, booking_id, req.new_end_time, now)
            .await?;
        tx.commit().await?;

        log::info!(
            "⏱️ Reserva {} extendida hasta {}",
            booking_id,
            req.new_end_time
        );

        self.run_post_commit(
            &extended,
            &[
                PostCommitEffect::InvalidateCache,
                PostCommitEffect::Emit(EventKind::BookingUpdated),
            ],
        )
        .await;

        Ok(extended)
    }

    /// Confirmación manual de una reserva pendiente o en conflicto, por un
    /// rol elevado, con re-chequeo de disponibilidad
    pub async fn confirm_booking(
        &self,
        booking_id: Uuid,
        caller: CallerContext,
    ) -> AppResult<Booking> {
        if !caller.is_elevated() {
            return Err(permission_error("confirm bookings"));
        }

        let booking = self.get_booking(booking_id).await?;
        let status = booking
            .status_enum()
            .ok_or_else(|| AppError::Internal(format!("unknown status '{}'", booking.status)))?;
        if !status.can_transition_to(BookingStatus::Confirmed) {
            return Err(state_error("confirm", &booking.status));
        }

        let availability = self
            .availability
            .check_availability(
                booking.vehicle_id,
                booking.start_time,
                booking.end_time,
                Some(booking.id),
            )
            .await?;
        if !availability.available {
            return Err(AppError::Conflict {
                message: availability
                    .reason
                    .unwrap_or_else(|| "vehicle not available".to_string()),
                conflicting_booking_id: availability.conflicting_booking_id,
            });
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let confirmed = self
            .bookings
            .set_status(&mut tx, booking_id, BookingStatus::Confirmed.as_str(), now)
            .await?;
        tx.commit().await?;

        log::info!("✅ Reserva {} confirmada manualmente", booking_id);

        self.run_post_commit(
            &confirmed,
            &[
                PostCommitEffect::InvalidateCache,
                PostCommitEffect::Emit(EventKind::BookingConfirmed),
            ],
        )
        .await;

        Ok(confirmed)
    }

    /// Ejecutar la lista ordenada de efectos post-commit. Cada efecto va
    /// con su propio catch: aquí ya no hay rollback posible.
    async fn run_post_commit(&self, booking: &Booking, effects: &[PostCommitEffect]) {
        for effect in effects {
            match effect {
                PostCommitEffect::DetectConflicts => {
                    if let Err(e) = self.detector.detect_and_record(booking).await {
                        log::error!(
                            "❌ Detección de conflictos falló para {}: {} - se re-escaneará en el sweep",
                            booking.id,
                            e
                        );
                    }
                }
                PostCommitEffect::InvalidateCache => {
                    self.availability
                        .invalidate_for(booking.vehicle_id, booking.group_id)
                        .await;
                }
                PostCommitEffect::Emit(kind) => {
                    self.events
                        .publish(
                            *kind,
                            booking.id,
                            booking.vehicle_id,
                            booking.group_id,
                            self.clock.now(),
                        )
                        .await;
                }
            }
        }
    }
}

/// Reglas puras de extensión: el nuevo fin debe ser posterior al actual y
/// la prórroga no puede superar el tope
pub fn validate_extension(
    policy: &BookingPolicy,
    current_end: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    if new_end <= current_end {
        violations.push(RuleViolation::new(
            "new_end_time",
            "after_current_end",
            "new end time must be after the current end time",
        ));
        return violations;
    }

    if new_end - current_end > chrono::Duration::hours(policy.extension_cap_hours) {
        violations.push(RuleViolation::new(
            "new_end_time",
            "extension_cap",
            format!(
                "extension cannot exceed {} hours",
                policy.extension_cap_hours
            ),
        ));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_extension_within_cap() {
        let policy = BookingPolicy::default();
        assert!(validate_extension(&policy, t(12, 0), t(13, 30)).is_empty());
        assert!(validate_extension(&policy, t(12, 0), t(14, 0)).is_empty());
    }

    #[test]
    fn test_extension_over_cap() {
        let policy = BookingPolicy::default();
        let v = validate_extension(&policy, t(12, 0), t(14, 30));
        assert!(v.iter().any(|r| r.rule == "extension_cap"));
    }

    #[test]
    fn test_extension_must_move_end_forward() {
        let policy = BookingPolicy::default();
        let v = validate_extension(&policy, t(12, 0), t(12, 0));
        assert!(v.iter().any(|r| r.rule == "after_current_end"));
        let v = validate_extension(&policy, t(12, 0), t(11, 0));
        assert!(v.iter().any(|r| r.rule == "after_current_end"));
    }
}
