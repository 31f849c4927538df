//! Detector y resolutor de conflictos
//!
//! Cinco chequeos independientes por reserva candidata: solapamiento
//! temporal, vehículo no disponible, cuota excedida, mantenimiento (hook
//! reservado) y restricción de grupo. Cada hallazgo crea un Conflict y la
//! reserva pasa a estado conflict. La detección es eventualmente
//! consistente: sus fallos se loguean y nunca bloquean la creación.
//!
//! El barrido en background re-escanea los conflictos sin resolver más
//! antiguos que el umbral y aplica resolución automática determinista.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::booking::BookingPolicy;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::caller::CallerContext;
use crate::models::conflict::{Conflict, ConflictType};
use crate::models::membership::GroupRules;
use crate::repositories::booking_repository::BookingRepository;
use crate::repositories::conflict_repository::ConflictRepository;
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::services::event_service::{EventKind, EventPublisher};
use crate::services::membership_service::MembershipService;
use crate::services::validation_service::validate_quotas;
use crate::utils::clock::SharedClock;
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Hallazgo de un chequeo del detector
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub conflict_type: ConflictType,
    pub conflicting_booking_id: Option<Uuid>,
}

/// Evaluación pura de las restricciones de grupo contra una reserva
pub fn evaluate_group_rules(
    rules: &GroupRules,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Option<Finding> {
    use chrono::Timelike;

    if let Some(max_hours) = rules.max_duration_hours {
        if end_time - start_time > Duration::hours(max_hours) {
            return Some(Finding {
                conflict_type: ConflictType::GroupRestriction,
                conflicting_booking_id: None,
            });
        }
    }

    if let (Some(from_hour), Some(to_hour)) = (rules.allowed_start_hour, rules.allowed_end_hour) {
        let hour = start_time.hour();
        let allowed = if from_hour <= to_hour {
            hour >= from_hour && hour < to_hour
        } else {
            // Ventana que cruza medianoche, p.ej. 22-06
            hour >= from_hour || hour < to_hour
        };
        if !allowed {
            return Some(Finding {
                conflict_type: ConflictType::GroupRestriction,
                conflicting_booking_id: None,
            });
        }
    }

    None
}

/// Datos mínimos de una reserva para decidir la resolución automática
#[derive(Debug, Clone)]
pub struct SweepBooking {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Decisión del barrido para un conflicto stale
#[derive(Debug, Clone, PartialEq)]
pub enum SweepAction {
    /// Solapamiento: se conserva la reserva que empieza antes
    CancelLater { cancel: Uuid, keep: Uuid },
    /// Vehículo no disponible: se cancela la reserva conflictuada
    CancelBooking(Uuid),
    /// Tipo sin regla automática: queda para resolución manual
    LeaveUnresolved,
}

/// Regla determinista de auto-resolución por tipo de conflicto
pub fn decide_auto_resolution(
    conflict_type: ConflictType,
    booking: &SweepBooking,
    other: Option<&SweepBooking>,
) -> SweepAction {
    match (conflict_type, other) {
        (ConflictType::TimeOverlap, Some(other)) => {
            // Gana la que empieza antes; a igualdad, la creada antes
            let booking_wins = (booking.start_time, booking.created_at)
                < (other.start_time, other.created_at);
            if booking_wins {
                SweepAction::CancelLater {
                    cancel: other.id,
                    keep: booking.id,
                }
            } else {
                SweepAction::CancelLater {
                    cancel: booking.id,
                    keep: other.id,
                }
            }
        }
        (ConflictType::VehicleUnavailable, _) => SweepAction::CancelBooking(booking.id),
        _ => SweepAction::LeaveUnresolved,
    }
}

/// Resumen de una pasada del barrido
#[derive(Debug, Default, Clone)]
pub struct SweepSummary {
    pub scanned: usize,
    pub resolved: usize,
    pub cancelled_bookings: usize,
    pub left_for_manual: usize,
}

pub struct ConflictService {
    pool: PgPool,
    policy: BookingPolicy,
    bookings: BookingRepository,
    conflicts: ConflictRepository,
    vehicles: VehicleRepository,
    membership: MembershipService,
    events: EventPublisher,
    clock: SharedClock,
}

impl ConflictService {
    pub fn new(
        pool: PgPool,
        policy: BookingPolicy,
        membership: MembershipService,
        events: EventPublisher,
        clock: SharedClock,
    ) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            conflicts: ConflictRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            pool,
            policy,
            membership,
            events,
            clock,
        }
    }

    /// Ejecutar los cinco chequeos contra una reserva ya persistida y
    /// devolver los hallazgos. Sin efectos secundarios.
    pub async fn scan_booking(&self, booking: &Booking) -> AppResult<Vec<Finding>> {
        let mut findings = Vec::new();

        // (a) Solapamiento con otras reservas activas del vehículo
        let overlapping = self
            .bookings
            .find_overlapping(
                booking.vehicle_id,
                booking.start_time,
                booking.end_time,
                Some(booking.id),
            )
            .await?;
        for other in &overlapping {
            findings.push(Finding {
                conflict_type: ConflictType::TimeOverlap,
                conflicting_booking_id: Some(other.id),
            });
        }

        // (b) Estado del vehículo
        let vehicle = self
            .vehicles
            .find_by_id(booking.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &booking.vehicle_id))?;
        if !vehicle.is_available() {
            findings.push(Finding {
                conflict_type: ConflictType::VehicleUnavailable,
                conflicting_booking_id: None,
            });
        }

        // (c) Re-chequeo de cuotas tras el commit (red de seguridad ante
        // carreras; la validación pre-commit sigue siendo la autoritativa).
        // La reserva ya está persistida: se descuenta a sí misma de los
        // counts antes de aplicar los mismos umbrales.
        let now = self.clock.now();
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let day_end = day_start + Duration::days(1);
        let daily = self
            .bookings
            .count_starting_in_day(booking.user_id, day_start, day_end)
            .await?;
        let active = self.bookings.count_active(booking.user_id, now).await?;

        let status = BookingStatus::parse(&booking.status);
        let counts_in_daily = booking.start_time >= day_start
            && booking.start_time < day_end
            && matches!(status, Some(BookingStatus::Pending | BookingStatus::Confirmed));
        let counts_in_active = booking.end_time > now
            && matches!(
                status,
                Some(BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress)
            );
        let self_daily = if counts_in_daily { 1 } else { 0 };
        let self_active = if counts_in_active { 1 } else { 0 };

        if !validate_quotas(&self.policy, daily - self_daily, active - self_active).is_empty() {
            findings.push(Finding {
                conflict_type: ConflictType::QuotaExceeded,
                conflicting_booking_id: None,
            });
        }

        // (d) Mantenimiento: hook reservado, pendiente de datos externos
        if let Some(finding) = self.check_maintenance_schedule(booking) {
            findings.push(finding);
        }

        // (e) Restricciones del grupo (lookup flaky: fallo = sin reglas)
        match self.membership.get_group_rules(booking.group_id).await {
            Ok(rules) => {
                if let Some(finding) =
                    evaluate_group_rules(&rules, booking.start_time, booking.end_time)
                {
                    findings.push(finding);
                }
            }
            Err(e) => {
                log::warn!(
                    "⚠️ Reglas de grupo no disponibles para {}: {} - chequeo omitido",
                    booking.group_id,
                    e
                );
            }
        }

        Ok(findings)
    }

    /// Hook de mantenimiento: no-op hasta integrar la agenda externa de
    /// mantenimiento de flota
    fn check_maintenance_schedule(&self, _booking: &Booking) -> Option<Finding> {
        None
    }

    /// Detectar y registrar conflictos para una reserva. Crea un Conflict
    /// por hallazgo y pasa la reserva a estado conflict en una transacción.
    pub async fn detect_and_record(&self, booking: &Booking) -> AppResult<Vec<Conflict>> {
        let findings = self.scan_booking(booking).await?;
        if findings.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(findings.len());

        for finding in &findings {
            let conflict = self
                .conflicts
                .insert(
                    &mut tx,
                    booking.id,
                    finding.conflicting_booking_id,
                    finding.conflict_type.as_str(),
                    now,
                )
                .await?;
            created.push(conflict);
        }

        // Solo pending/confirmed pueden pasar a conflict
        let current = BookingStatus::parse(&booking.status);
        if matches!(current, Some(s) if s.can_transition_to(BookingStatus::Conflict)) {
            self.bookings
                .set_status(&mut tx, booking.id, BookingStatus::Conflict.as_str(), now)
                .await?;
        }

        tx.commit().await?;

        log::warn!(
            "⚠️ {} conflicto(s) registrados para reserva {}",
            created.len(),
            booking.id
        );

        self.events
            .publish(
                EventKind::ConflictDetected,
                booking.id,
                booking.vehicle_id,
                booking.group_id,
                now,
            )
            .await;

        Ok(created)
    }

    /// Resolución manual de un conflicto por un caller con rol elevado
    pub async fn resolve_manual(
        &self,
        conflict_id: Uuid,
        caller: CallerContext,
        note: &str,
    ) -> AppResult<Conflict> {
        if !caller.is_elevated() {
            return Err(AppError::Permission(
                "only elevated roles can resolve conflicts".to_string(),
            ));
        }

        let conflict = self
            .conflicts
            .find_by_id(conflict_id)
            .await?
            .ok_or_else(|| not_found_error("Conflict", &conflict_id))?;

        if conflict.resolved {
            return Err(AppError::State(
                "conflict is already resolved".to_string(),
            ));
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let resolved = self
            .conflicts
            .resolve(&mut tx, conflict_id, &caller.label(), note, now)
            .await?;
        tx.commit().await?;

        if let Some(booking) = self.bookings.find_by_id(conflict.booking_id).await? {
            self.events
                .publish(
                    EventKind::ConflictResolved,
                    booking.id,
                    booking.vehicle_id,
                    booking.group_id,
                    now,
                )
                .await;
        }

        Ok(resolved)
    }

    pub async fn list_unresolved(&self, limit: i64) -> AppResult<Vec<Conflict>> {
        self.conflicts.find_unresolved(limit).await
    }

    /// Barrido de conflictos stale (> umbral, sin resolver) con resolución
    /// automática determinista. Cada conflicto se procesa aislado: un fallo
    /// en uno no detiene el resto.
    pub async fn sweep_stale_conflicts(&self) -> AppResult<SweepSummary> {
        let now = self.clock.now();
        let cutoff = now - Duration::hours(self.policy.stale_conflict_hours);
        let stale = self.conflicts.find_stale_unresolved(cutoff, 100).await?;

        let mut summary = SweepSummary {
            scanned: stale.len(),
            ..Default::default()
        };

        for conflict in stale {
            match self.auto_resolve_one(&conflict, now).await {
                Ok(ResolveOutcome::Resolved { booking_cancelled }) => {
                    summary.resolved += 1;
                    if booking_cancelled {
                        summary.cancelled_bookings += 1;
                    }
                }
                Ok(ResolveOutcome::LeftForManual) => {
                    summary.left_for_manual += 1;
                    log::info!(
                        "📋 Conflicto {} (tipo {}) requiere resolución manual",
                        conflict.id,
                        conflict.conflict_type
                    );
                }
                Err(e) => {
                    log::error!(
                        "❌ Error auto-resolviendo conflicto {}: {}",
                        conflict.id,
                        e
                    );
                }
            }
        }

        Ok(summary)
    }

    async fn auto_resolve_one(
        &self,
        conflict: &Conflict,
        now: DateTime<Utc>,
    ) -> AppResult<ResolveOutcome> {
        let Some(conflict_type) = ConflictType::parse(&conflict.conflict_type) else {
            return Ok(ResolveOutcome::LeftForManual);
        };

        let booking = self
            .bookings
            .find_by_id(conflict.booking_id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &conflict.booking_id))?;

        let other = match conflict.conflicting_booking_id {
            Some(other_id) => self.bookings.find_by_id(other_id).await?,
            None => None,
        };

        let action = decide_auto_resolution(
            conflict_type,
            &SweepBooking {
                id: booking.id,
                start_time: booking.start_time,
                created_at: booking.created_at,
            },
            other
                .as_ref()
                .map(|b| SweepBooking {
                    id: b.id,
                    start_time: b.start_time,
                    created_at: b.created_at,
                })
                .as_ref(),
        );

        match action {
            SweepAction::CancelLater { cancel, keep } => {
                let note = format!(
                    "auto-resolved: kept earlier booking {}, cancelled {}",
                    keep, cancel
                );
                self.apply_cancel_resolution(conflict, cancel, Some(keep), &note, now)
                    .await?;
                Ok(ResolveOutcome::Resolved {
                    booking_cancelled: true,
                })
            }
            SweepAction::CancelBooking(cancel) => {
                let note = format!(
                    "auto-resolved: vehicle unavailable, cancelled booking {}",
                    cancel
                );
                self.apply_cancel_resolution(conflict, cancel, None, &note, now)
                    .await?;
                Ok(ResolveOutcome::Resolved {
                    booking_cancelled: true,
                })
            }
            SweepAction::LeaveUnresolved => Ok(ResolveOutcome::LeftForManual),
        }
    }

    /// Aplicar una resolución que cancela una reserva: cancelación, marca
    /// del conflicto y eventual restauración de la reserva conservada, todo
    /// en una transacción.
    async fn apply_cancel_resolution(
        &self,
        conflict: &Conflict,
        cancel_id: Uuid,
        keep_id: Option<Uuid>,
        note: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let to_cancel = self
            .bookings
            .find_by_id_for_update(&mut tx, cancel_id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &cancel_id))?;

        // Una reserva ya terminal solo necesita que el conflicto se cierre
        let mut cancelled = false;
        if let Some(status) = BookingStatus::parse(&to_cancel.status) {
            if status.can_transition_to(BookingStatus::Cancelled) {
                self.bookings
                    .cancel(&mut tx, cancel_id, Some(note), now)
                    .await?;
                cancelled = true;
            }
        }

        // La reserva conservada vuelve a confirmed si estaba en conflict
        if let Some(keep_id) = keep_id {
            if let Some(kept) = self.bookings.find_by_id_for_update(&mut tx, keep_id).await? {
                if kept.status == BookingStatus::Conflict.as_str() {
                    self.bookings
                        .set_status(&mut tx, keep_id, BookingStatus::Confirmed.as_str(), now)
                        .await?;
                }
            }
        }

        self.conflicts
            .resolve(&mut tx, conflict.id, &CallerContext::Internal.label(), note, now)
            .await?;

        tx.commit().await?;

        log::info!(
            "🔧 Conflicto {} auto-resuelto ({}cancelada {})",
            conflict.id,
            if cancelled { "" } else { "ya terminal, no " },
            cancel_id
        );

        if let Some(booking) = self.bookings.find_by_id(cancel_id).await? {
            self.events
                .publish(
                    EventKind::ConflictResolved,
                    conflict.booking_id,
                    booking.vehicle_id,
                    booking.group_id,
                    now,
                )
                .await;
            if cancelled {
                self.events
                    .publish(
                        EventKind::BookingCancelled,
                        booking.id,
                        booking.vehicle_id,
                        booking.group_id,
                        now,
                    )
                    .await;
            }
        }

        Ok(())
    }
}

enum ResolveOutcome {
    Resolved { booking_cancelled: bool },
    LeftForManual,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, h, 0, 0).unwrap()
    }

    fn sweep_booking(id: Uuid, start: DateTime<Utc>, created: DateTime<Utc>) -> SweepBooking {
        SweepBooking {
            id,
            start_time: start,
            created_at: created,
        }
    }

    #[test]
    fn test_overlap_resolution_cancels_later_start() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        // X empieza antes que Y: se cancela Y, se conserva X
        let action = decide_auto_resolution(
            ConflictType::TimeOverlap,
            &sweep_booking(y, t(10, 10), t(9, 0)),
            Some(&sweep_booking(x, t(10, 9), t(9, 1))),
        );
        assert_eq!(action, SweepAction::CancelLater { cancel: y, keep: x });
    }

    #[test]
    fn test_overlap_resolution_tie_breaks_on_created_at() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // Mismo start: gana la creada antes
        let action = decide_auto_resolution(
            ConflictType::TimeOverlap,
            &sweep_booking(a, t(10, 9), t(9, 0)),
            Some(&sweep_booking(b, t(10, 9), t(9, 2))),
        );
        assert_eq!(action, SweepAction::CancelLater { cancel: b, keep: a });
    }

    #[test]
    fn test_vehicle_unavailable_cancels_booking() {
        let id = Uuid::new_v4();
        let action = decide_auto_resolution(
            ConflictType::VehicleUnavailable,
            &sweep_booking(id, t(10, 9), t(9, 0)),
            None,
        );
        assert_eq!(action, SweepAction::CancelBooking(id));
    }

    #[test]
    fn test_unknown_types_left_for_manual_handling() {
        let id = Uuid::new_v4();
        let booking = sweep_booking(id, t(10, 9), t(9, 0));
        for ct in [
            ConflictType::QuotaExceeded,
            ConflictType::Maintenance,
            ConflictType::GroupRestriction,
        ] {
            assert_eq!(
                decide_auto_resolution(ct, &booking, None),
                SweepAction::LeaveUnresolved
            );
        }
        // time_overlap sin la otra reserva tampoco se puede decidir
        assert_eq!(
            decide_auto_resolution(ConflictType::TimeOverlap, &booking, None),
            SweepAction::LeaveUnresolved
        );
    }

    #[test]
    fn test_group_rules_max_duration() {
        let rules = GroupRules {
            max_duration_hours: Some(4),
            ..Default::default()
        };
        assert!(evaluate_group_rules(&rules, t(10, 9), t(10, 12)).is_none());
        let finding = evaluate_group_rules(&rules, t(10, 9), t(10, 14)).unwrap();
        assert_eq!(finding.conflict_type, ConflictType::GroupRestriction);
    }

    #[test]
    fn test_group_rules_allowed_window() {
        let rules = GroupRules {
            max_duration_hours: None,
            allowed_start_hour: Some(8),
            allowed_end_hour: Some(20),
        };
        assert!(evaluate_group_rules(&rules, t(10, 9), t(10, 12)).is_none());
        assert!(evaluate_group_rules(&rules, t(10, 6), t(10, 9)).is_some());
        assert!(evaluate_group_rules(&rules, t(10, 21), t(10, 23)).is_some());
    }

    #[test]
    fn test_group_rules_window_across_midnight() {
        let rules = GroupRules {
            max_duration_hours: None,
            allowed_start_hour: Some(22),
            allowed_end_hour: Some(6),
        };
        assert!(evaluate_group_rules(&rules, t(10, 23), t(11, 2)).is_none());
        assert!(evaluate_group_rules(&rules, t(10, 3), t(10, 5)).is_none());
        assert!(evaluate_group_rules(&rules, t(10, 12), t(10, 15)).is_some());
    }

    #[test]
    fn test_no_rules_no_finding() {
        let rules = GroupRules::default();
        assert!(evaluate_group_rules(&rules, t(10, 0), t(10, 23)).is_none());
    }
}
