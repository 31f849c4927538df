//! Política de reservas
//!
//! Constantes del motor de scheduling: límites de duración, ventanas,
//! cuotas, umbral de auto-confirmación, tarifas y TTLs. Los valores con
//! sentido monetario se pueden sobreescribir por entorno.

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Política del motor de reservas
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    // Reglas de validación (§ duración y ventanas)
    pub min_duration_hours: i64,
    pub max_duration_hours: i64,
    pub max_advance_days: i64,
    pub same_day_cutoff_hours: i64,
    pub max_purpose_length: usize,
    // Cuotas por usuario
    pub max_bookings_per_day: i64,
    pub max_active_bookings: i64,
    // Scoring y extensión
    pub auto_confirm_threshold: i32,
    pub extension_cap_hours: i64,
    pub check_in_grace_minutes: i64,
    // Tarifas (fórmula de coste autoritativa: horas*hourly + km*per_km)
    pub hourly_rate: Decimal,
    pub per_km_rate: Decimal,
    // Cache y locks
    pub availability_cache_ttl_secs: u64,
    pub job_lock_ttl_secs: u64,
    // Jobs en background
    pub stale_conflict_hours: i64,
    pub retention_days: i64,
    pub reminder_lead_minutes: i64,
    pub warmup_days: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_duration_hours: 2,
            max_duration_hours: 24,
            max_advance_days: 30,
            same_day_cutoff_hours: 2,
            max_purpose_length: 500,
            max_bookings_per_day: 3,
            max_active_bookings: 5,
            auto_confirm_threshold: 80,
            extension_cap_hours: 2,
            check_in_grace_minutes: 15,
            hourly_rate: decimal_from_env("BOOKING_HOURLY_RATE", "2.50"),
            per_km_rate: decimal_from_env("BOOKING_PER_KM_RATE", "0.30"),
            availability_cache_ttl_secs: 300,
            job_lock_ttl_secs: 600,
            stale_conflict_hours: 24,
            retention_days: 365,
            reminder_lead_minutes: 60,
            warmup_days: 7,
        }
    }
}

fn decimal_from_env(var: &str, default: &str) -> Decimal {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    Decimal::from_str(&raw).unwrap_or_else(|_| {
        log::warn!("⚠️ Valor inválido en {} ('{}'), usando {}", var, raw, default);
        Decimal::from_str(default).expect("default rate must parse")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_rules() {
        let policy = BookingPolicy::default();
        assert_eq!(policy.min_duration_hours, 2);
        assert_eq!(policy.max_duration_hours, 24);
        assert_eq!(policy.max_advance_days, 30);
        assert_eq!(policy.same_day_cutoff_hours, 2);
        assert_eq!(policy.max_bookings_per_day, 3);
        assert_eq!(policy.max_active_bookings, 5);
        assert_eq!(policy.auto_confirm_threshold, 80);
        assert_eq!(policy.extension_cap_hours, 2);
    }
}
