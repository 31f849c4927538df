//! Motor de validación de reservas
//!
//! Reglas sin efectos secundarios sobre los campos de la reserva, más el
//! chequeo de cuotas por usuario alimentado por counts del repositorio.
//! Todas las violaciones se acumulan y se devuelven juntas, nunca solo
//! la primera.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::booking::BookingPolicy;
use crate::repositories::booking_repository::BookingRepository;
use crate::utils::clock::SharedClock;
use crate::utils::errors::{AppError, AppResult, RuleViolation};

/// Pasada pura sobre los campos temporales y de texto de la reserva.
/// El día natural se evalúa en UTC.
pub fn validate_booking_fields(
    policy: &BookingPolicy,
    now: DateTime<Utc>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    purpose: &str,
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    if purpose.trim().is_empty() {
        violations.push(RuleViolation::new(
            "purpose",
            "required",
            "purpose is required",
        ));
    }

    if purpose.chars().count() > policy.max_purpose_length {
        violations.push(RuleViolation::new(
            "purpose",
            "max_length",
            format!(
                "purpose must be at most {} characters",
                policy.max_purpose_length
            ),
        ));
    }

    if start_time <= now {
        violations.push(RuleViolation::new(
            "start_time",
            "future",
            "start time must be in the future",
        ));
    }

    if end_time <= start_time {
        violations.push(RuleViolation::new(
            "end_time",
            "after_start",
            "end time must be after start time",
        ));
        // Sin un intervalo bien formado las reglas de duración no aplican
        return violations;
    }

    let duration = end_time - start_time;
    if duration < Duration::hours(policy.min_duration_hours) {
        violations.push(RuleViolation::new(
            "end_time",
            "min_duration",
            format!(
                "booking must last at least {} hours",
                policy.min_duration_hours
            ),
        ));
    }
    if duration > Duration::hours(policy.max_duration_hours) {
        violations.push(RuleViolation::new(
            "end_time",
            "max_duration",
            format!(
                "booking must last at most {} hours",
                policy.max_duration_hours
            ),
        ));
    }

    if start_time > now + Duration::days(policy.max_advance_days) {
        violations.push(RuleViolation::new(
            "start_time",
            "max_advance",
            format!(
                "booking cannot start more than {} days ahead",
                policy.max_advance_days
            ),
        ));
    }

    // Corte para el mismo día: si empieza hoy, debe ir con antelación mínima
    if start_time.date_naive() == now.date_naive()
        && start_time - now < Duration::hours(policy.same_day_cutoff_hours)
    {
        violations.push(RuleViolation::new(
            "start_time",
            "same_day_cutoff",
            format!(
                "same-day bookings need at least {} hours of notice",
                policy.same_day_cutoff_hours
            ),
        ));
    }

    violations
}

/// Pasada pura sobre las cuotas, con los counts ya resueltos
pub fn validate_quotas(
    policy: &BookingPolicy,
    bookings_starting_today: i64,
    active_bookings: i64,
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    if bookings_starting_today >= policy.max_bookings_per_day {
        violations.push(RuleViolation::new(
            "user_id",
            "daily_quota",
            format!(
                "user already has {} bookings starting today (max {})",
                bookings_starting_today, policy.max_bookings_per_day
            ),
        ));
    }

    if active_bookings >= policy.max_active_bookings {
        violations.push(RuleViolation::new(
            "user_id",
            "active_quota",
            format!(
                "user already has {} active bookings (max {})",
                active_bookings, policy.max_active_bookings
            ),
        ));
    }

    violations
}

/// Servicio de validación: reglas puras + counts de cuota del repositorio
pub struct ValidationService {
    policy: BookingPolicy,
    bookings: BookingRepository,
    clock: SharedClock,
}

impl ValidationService {
    pub fn new(pool: PgPool, policy: BookingPolicy, clock: SharedClock) -> Self {
        Self {
            policy,
            bookings: BookingRepository::new(pool),
            clock,
        }
    }

    /// Counts de cuota del usuario. La cuota diaria cuenta reservas que
    /// empiezan dentro del día natural ACTUAL (el de "ahora"), en UTC.
    pub async fn quota_violations(&self, user_id: Uuid) -> AppResult<Vec<RuleViolation>> {
        let now = self.clock.now();
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let day_end = day_start + Duration::days(1);

        let daily = self
            .bookings
            .count_starting_in_day(user_id, day_start, day_end)
            .await?;
        let active = self.bookings.count_active(user_id, now).await?;

        Ok(validate_quotas(&self.policy, daily, active))
    }

    /// Validación completa de una reserva nueva: campos + cuotas.
    /// Devuelve la lista completa de violaciones si hay alguna.
    pub async fn validate_new_booking(
        &self,
        user_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        purpose: &str,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let mut violations =
            validate_booking_fields(&self.policy, now, start_time, end_time, purpose);
        violations.extend(self.quota_violations(user_id).await?);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(violations))
        }
    }

    /// Re-validación de campos en una actualización (sin cuotas: la reserva
    /// ya cuenta en ellas)
    pub fn validate_updated_fields(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        purpose: &str,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let violations = validate_booking_fields(&self.policy, now, start_time, end_time, purpose);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> BookingPolicy {
        BookingPolicy::default()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_booking_has_no_violations() {
        let start = Utc.with_ymd_and_hms(2026, 3, 12, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 12, 13, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "client visit");
        assert!(v.is_empty(), "unexpected violations: {:?}", v);
    }

    #[test]
    fn test_all_violations_are_reported_together() {
        // Pasado, propósito vacío: dos violaciones a la vez
        let start = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "  ");
        assert!(v.iter().any(|r| r.rule == "future"));
        assert!(v.iter().any(|r| r.rule == "required"));
        assert!(v.len() >= 2);
    }

    #[test]
    fn test_end_before_start() {
        let start = Utc.with_ymd_and_hms(2026, 3, 12, 13, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 12, 9, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "errand");
        assert!(v.iter().any(|r| r.rule == "after_start"));
    }

    #[test]
    fn test_duration_bounds() {
        // 1 hora: por debajo del mínimo
        let start = Utc.with_ymd_and_hms(2026, 3, 12, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 12, 10, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "errand");
        assert!(v.iter().any(|r| r.rule == "min_duration"));

        // 25 horas: por encima del máximo
        let end = Utc.with_ymd_and_hms(2026, 3, 13, 10, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "errand");
        assert!(v.iter().any(|r| r.rule == "max_duration"));
    }

    #[test]
    fn test_max_advance_window() {
        let start = Utc.with_ymd_and_hms(2026, 4, 20, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 4, 20, 12, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "trip");
        assert!(v.iter().any(|r| r.rule == "max_advance"));
    }

    #[test]
    fn test_same_day_cutoff() {
        // Hoy a las 13:30, con now a las 12:00: solo 1.5h de antelación
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 13, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 16, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "errand");
        assert!(v.iter().any(|r| r.rule == "same_day_cutoff"));

        // Hoy a las 15:00: 3h de antelación, permitido
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();
        let v = validate_booking_fields(&policy(), now(), start, end, "errand");
        assert!(!v.iter().any(|r| r.rule == "same_day_cutoff"));
    }

    #[test]
    fn test_purpose_too_long() {
        let start = Utc.with_ymd_and_hms(2026, 3, 12, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 12, 12, 0, 0).unwrap();
        let long_purpose = "x".repeat(501);
        let v = validate_booking_fields(&policy(), now(), start, end, &long_purpose);
        assert!(v.iter().any(|r| r.rule == "max_length"));
    }

    #[test]
    fn test_quota_limits() {
        assert!(validate_quotas(&policy(), 0, 0).is_empty());
        assert!(validate_quotas(&policy(), 2, 4).is_empty());

        let v = validate_quotas(&policy(), 3, 0);
        assert!(v.iter().any(|r| r.rule == "daily_quota"));

        let v = validate_quotas(&policy(), 0, 5);
        assert!(v.iter().any(|r| r.rule == "active_quota"));

        let v = validate_quotas(&policy(), 4, 6);
        assert_eq!(v.len(), 2);
    }
}
