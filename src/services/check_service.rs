//! Handler de check-in / check-out
//!
//! Valida y registra la recogida y devolución física del vehículo, con la
//! transición de estado de la reserva y del vehículo en una sola
//! transacción. Tras el check-out deriva las estadísticas de uso y el
//! coste con la fórmula autoritativa: horas × tarifa-hora + km × tarifa-km.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::booking::BookingPolicy;
use crate::dto::check_dto::{CheckInRequest, CheckOutRequest, UsageStats};
use crate::models::booking::BookingStatus;
use crate::models::caller::CallerContext;
use crate::models::check_log::{CheckAction, CheckLog};
use crate::models::vehicle::VehicleStatus;
use crate::repositories::booking_repository::BookingRepository;
use crate::repositories::check_log_repository::{CheckLogRepository, NewCheckLog};
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::services::availability_service::AvailabilityService;
use crate::services::event_service::{EventKind, EventPublisher};
use crate::utils::clock::SharedClock;
use crate::utils::errors::{
    not_found_error, permission_error, state_error, AppError, AppResult, RuleViolation,
};
use crate::utils::validation::{
    validate_battery_percent, validate_coordinates, validate_non_negative,
};

/// Chequeos de shape comunes a check-in y check-out
fn reading_violations(
    odometer: Decimal,
    battery_percent: i32,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    if validate_non_negative(odometer).is_err() {
        violations.push(RuleViolation::new(
            "odometer",
            "non_negative",
            "odometer reading cannot be negative",
        ));
    }
    if validate_battery_percent(battery_percent).is_err() {
        violations.push(RuleViolation::new(
            "battery_percent",
            "range",
            "battery percent must be between 0 and 100",
        ));
    }
    if let (Some(lat), Some(lng)) = (latitude, longitude) {
        if validate_coordinates(lat, lng).is_err() {
            violations.push(RuleViolation::new(
                "location",
                "coordinates",
                "latitude/longitude are out of range",
            ));
        }
    }

    violations
}

/// Ventana válida de check-in para callers sin rol elevado:
/// [start - gracia, end]
pub fn check_in_window_ok(
    now: DateTime<Utc>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    grace_minutes: i64,
) -> bool {
    now >= start_time - Duration::minutes(grace_minutes) && now <= end_time
}

/// Estadísticas de uso derivadas de los dos registros de check.
/// Fórmula de coste única: duración_horas × tarifa_hora + km × tarifa_km.
pub fn compute_usage_stats(
    hourly_rate: Decimal,
    per_km_rate: Decimal,
    check_in_odometer: Decimal,
    check_out_odometer: Decimal,
    check_in_battery: i32,
    check_out_battery: i32,
    check_in_at: DateTime<Utc>,
    check_out_at: DateTime<Utc>,
) -> UsageStats {
    let distance_km = check_out_odometer - check_in_odometer;
    let duration_secs = (check_out_at - check_in_at).num_seconds().max(0);
    let duration_hours =
        (Decimal::from(duration_secs) / Decimal::from(3600)).round_dp(2);
    let energy_consumed_percent = check_in_battery - check_out_battery;
    let cost = (duration_hours * hourly_rate + distance_km * per_km_rate).round_dp(2);

    UsageStats {
        distance_km,
        duration_hours,
        energy_consumed_percent,
        cost,
    }
}

pub struct CheckService {
    pool: PgPool,
    policy: BookingPolicy,
    bookings: BookingRepository,
    vehicles: VehicleRepository,
    check_logs: CheckLogRepository,
    availability: AvailabilityService,
    events: EventPublisher,
    clock: SharedClock,
}

impl CheckService {
    pub fn new(
        pool: PgPool,
        policy: BookingPolicy,
        availability: AvailabilityService,
        events: EventPublisher,
        clock: SharedClock,
    ) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            check_logs: CheckLogRepository::new(pool.clone()),
            pool,
            policy,
            availability,
            events,
            clock,
        }
    }

    /// Check-in: precondiciones + (log, reserva in_progress, vehículo
    /// in_use) en una transacción
    pub async fn check_in(
        &self,
        booking_id: Uuid,
        caller: CallerContext,
        req: &CheckInRequest,
    ) -> AppResult<CheckLog> {
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;

        let booking = self
            .bookings
            .find_by_id_for_update(&mut tx, booking_id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &booking_id))?;

        if !caller.is_user(&booking.user_id) && !caller.is_elevated() {
            return Err(permission_error("check in this booking"));
        }

        if booking.status != BookingStatus::Confirmed.as_str() {
            return Err(state_error("check in", &booking.status));
        }

        if self
            .check_logs
            .find_by_booking_and_action(booking_id, CheckAction::CheckIn.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::State(
                "booking already has a check-in record".to_string(),
            ));
        }

        let vehicle = self
            .vehicles
            .find_by_id_for_update(&mut tx, booking.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &booking.vehicle_id))?;

        let mut violations = reading_violations(
            req.odometer,
            req.battery_percent,
            req.latitude,
            req.longitude,
        );

        // Ventana temporal: solo para callers sin rol elevado
        if !caller.is_elevated()
            && !check_in_window_ok(
                now,
                booking.start_time,
                booking.end_time,
                self.policy.check_in_grace_minutes,
            )
        {
            violations.push(RuleViolation::new(
                "check_in",
                "time_window",
                format!(
                    "check-in is only allowed from {} minutes before start until the booking end",
                    self.policy.check_in_grace_minutes
                ),
            ));
        }

        // Monotonicidad del odómetro: rechazo para callers normales,
        // warning para roles elevados
        if req.odometer < vehicle.current_odometer {
            if caller.is_elevated() {
                log::warn!(
                    "⚠️ Odómetro regresivo en check-in de {} ({} < {}) aceptado por rol elevado",
                    booking_id,
                    req.odometer,
                    vehicle.current_odometer
                );
            } else {
                violations.push(RuleViolation::new(
                    "odometer",
                    "monotonic",
                    format!(
                        "odometer reading {} is below the vehicle's recorded {}",
                        req.odometer, vehicle.current_odometer
                    ),
                ));
            }
        }

        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        let new_log = NewCheckLog {
            booking_id,
            action: CheckAction::CheckIn.as_str().to_string(),
            odometer: req.odometer,
            battery_percent: req.battery_percent,
            notes: req.notes.clone(),
            latitude: req.latitude,
            longitude: req.longitude,
            performed_by: req.caller.user_id,
            signature: req.signature.clone(),
        };

        let check_log = self.check_logs.insert(&mut tx, &new_log, now).await?;
        let booking = self
            .bookings
            .record_check_in(&mut tx, booking_id, req.odometer, req.battery_percent, now)
            .await?;
        self.vehicles
            .set_usage_state(
                &mut tx,
                booking.vehicle_id,
                VehicleStatus::InUse.as_str(),
                req.odometer,
                req.battery_percent,
            )
            .await?;

        tx.commit().await?;

        log::info!("🔑 Check-in registrado para reserva {}", booking_id);

        self.availability
            .invalidate_for(booking.vehicle_id, booking.group_id)
            .await;
        self.events
            .publish(
                EventKind::CheckIn,
                booking.id,
                booking.vehicle_id,
                booking.group_id,
                now,
            )
            .await;

        Ok(check_log)
    }

    /// Check-out: precondiciones + (log, reserva completed, vehículo
    /// available) en una transacción; estadísticas de uso post-commit
    pub async fn check_out(
        &self,
        booking_id: Uuid,
        caller: CallerContext,
        req: &CheckOutRequest,
    ) -> AppResult<(CheckLog, UsageStats)> {
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;

        let booking = self
            .bookings
            .find_by_id_for_update(&mut tx, booking_id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &booking_id))?;

        if !caller.is_user(&booking.user_id) && !caller.is_elevated() {
            return Err(permission_error("check out this booking"));
        }

        if booking.status != BookingStatus::InProgress.as_str() {
            return Err(state_error("check out", &booking.status));
        }

        let check_in = self
            .check_logs
            .find_by_booking_and_action(booking_id, CheckAction::CheckIn.as_str())
            .await?
            .ok_or_else(|| {
                AppError::State("booking has no check-in record".to_string())
            })?;

        if self
            .check_logs
            .find_by_booking_and_action(booking_id, CheckAction::CheckOut.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::State(
                "booking already has a check-out record".to_string(),
            ));
        }

        let mut violations = reading_violations(
            req.odometer,
            req.battery_percent,
            req.latitude,
            req.longitude,
        );

        // El odómetro de salida nunca puede ser menor que el de entrada
        if req.odometer < check_in.odometer {
            violations.push(RuleViolation::new(
                "odometer",
                "monotonic",
                format!(
                    "check-out odometer {} is below the check-in reading {}",
                    req.odometer, check_in.odometer
                ),
            ));
        }

        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        let new_log = NewCheckLog {
            booking_id,
            action: CheckAction::CheckOut.as_str().to_string(),
            odometer: req.odometer,
            battery_percent: req.battery_percent,
            notes: req.notes.clone(),
            latitude: req.latitude,
            longitude: req.longitude,
            performed_by: req.caller.user_id,
            signature: req.signature.clone(),
        };

        let check_log = self.check_logs.insert(&mut tx, &new_log, now).await?;
        let booking = self
            .bookings
            .record_check_out(&mut tx, booking_id, req.odometer, req.battery_percent, now)
            .await?;
        self.vehicles
            .set_usage_state(
                &mut tx,
                booking.vehicle_id,
                VehicleStatus::Available.as_str(),
                req.odometer,
                req.battery_percent,
            )
            .await?;

        tx.commit().await?;

        log::info!("🏁 Check-out registrado para reserva {}", booking_id);

        // Post-commit: derivar estadísticas y persistirlas sobre la reserva.
        // Un fallo aquí se loguea; el check-out ya está commiteado.
        let stats = compute_usage_stats(
            self.policy.hourly_rate,
            self.policy.per_km_rate,
            check_in.odometer,
            req.odometer,
            check_in.battery_percent,
            req.battery_percent,
            check_in.created_at,
            now,
        );
        if let Err(e) = self
            .bookings
            .record_usage_stats(booking_id, stats.distance_km, stats.cost, now)
            .await
        {
            log::error!(
                "❌ No se pudieron persistir las estadísticas de {}: {}",
                booking_id,
                e
            );
        }

        self.availability
            .invalidate_for(booking.vehicle_id, booking.group_id)
            .await;
        self.events
            .publish(
                EventKind::CheckOut,
                booking.id,
                booking.vehicle_id,
                booking.group_id,
                now,
            )
            .await;

        Ok((check_log, stats))
    }

    pub async fn get_logs(&self, booking_id: Uuid) -> AppResult<Vec<CheckLog>> {
        let booking = self.bookings.find_by_id(booking_id).await?;
        if booking.is_none() {
            return Err(not_found_error("Booking", &booking_id));
        }
        self.check_logs.find_by_booking(booking_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_check_in_window() {
        let start = t(10, 0);
        let end = t(14, 0);
        // 15 minutos antes del inicio: permitido
        assert!(check_in_window_ok(t(9, 45), start, end, 15));
        // 30 minutos antes: fuera de ventana
        assert!(!check_in_window_ok(t(9, 30), start, end, 15));
        // Durante la reserva: permitido
        assert!(check_in_window_ok(t(12, 0), start, end, 15));
        // Justo al final: permitido
        assert!(check_in_window_ok(t(14, 0), start, end, 15));
        // Tras el final: fuera
        assert!(!check_in_window_ok(t(14, 1), start, end, 15));
    }

    #[test]
    fn test_usage_stats_formula() {
        // 3 horas, 60 km, batería 90% -> 60%
        let stats = compute_usage_stats(
            dec("2.50"),
            dec("0.30"),
            dec("12000"),
            dec("12060"),
            90,
            60,
            t(9, 0),
            t(12, 0),
        );
        assert_eq!(stats.distance_km, dec("60"));
        assert_eq!(stats.duration_hours, dec("3.00"));
        assert_eq!(stats.energy_consumed_percent, 30);
        // 3 * 2.50 + 60 * 0.30 = 7.50 + 18.00 = 25.50
        assert_eq!(stats.cost, dec("25.50"));
    }

    #[test]
    fn test_usage_stats_zero_distance() {
        let stats = compute_usage_stats(
            dec("2.50"),
            dec("0.30"),
            dec("500"),
            dec("500"),
            80,
            75,
            t(9, 0),
            t(11, 30),
        );
        assert_eq!(stats.distance_km, dec("0"));
        assert_eq!(stats.duration_hours, dec("2.50"));
        // 2.5 * 2.50 = 6.25
        assert_eq!(stats.cost, dec("6.25"));
    }

    #[test]
    fn test_usage_stats_charged_during_trip() {
        // El usuario cargó el coche: energía "consumida" negativa
        let stats = compute_usage_stats(
            dec("2.50"),
            dec("0.30"),
            dec("100"),
            dec("110"),
            40,
            90,
            t(9, 0),
            t(12, 0),
        );
        assert_eq!(stats.energy_consumed_percent, -50);
    }
}
