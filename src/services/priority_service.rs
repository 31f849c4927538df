//! Scorer de prioridad
//!
//! Combina cuatro señales con pesos fijos: ownership del usuario en el
//! grupo (0.40), uso reciente (0.30), antelación (0.20) y propósito
//! declarado (0.10). El resultado se redondea y se recorta a [0, 100].
//! Si alguna entrada upstream falla, el scorer devuelve el neutro 50:
//! la disponibilidad del scheduler pesa más que la precisión del score.

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::booking::PurposeType;
use crate::repositories::booking_repository::BookingRepository;
use crate::services::membership_service::MembershipService;
use crate::utils::clock::SharedClock;

/// Score neutro cuando alguna señal upstream no está disponible
pub const NEUTRAL_SCORE: i32 = 50;

const OWNERSHIP_WEIGHT: f64 = 0.40;
const USAGE_WEIGHT: f64 = 0.30;
const LEAD_TIME_WEIGHT: f64 = 0.20;
const PURPOSE_WEIGHT: f64 = 0.10;

lazy_static! {
    static ref PURPOSE_WEIGHTS: HashMap<PurposeType, f64> = {
        let mut m = HashMap::new();
        m.insert(PurposeType::Business, 1.0);
        m.insert(PurposeType::Emergency, 1.2);
        m.insert(PurposeType::Family, 0.8);
        m.insert(PurposeType::Personal, 0.6);
        m.insert(PurposeType::Other, 0.5);
        m
    };
}

/// Sub-score de ownership: lineal en el porcentaje de propiedad
pub fn ownership_score(ownership_percent: f64) -> f64 {
    ownership_percent.clamp(0.0, 100.0)
}

/// Sub-score de uso: 100 menos 2 puntos por hora usada en 30 días
pub fn usage_score(hours_last_30_days: f64) -> f64 {
    (100.0 - 2.0 * hours_last_30_days).clamp(0.0, 100.0)
}

/// Sub-score de antelación por tramos
pub fn lead_time_score(lead: Duration) -> f64 {
    if lead <= Duration::hours(2) {
        20.0
    } else if lead <= Duration::hours(24) {
        50.0
    } else if lead <= Duration::days(7) {
        80.0
    } else {
        100.0
    }
}

/// Sub-score de propósito: peso del tipo × 100
pub fn purpose_score(purpose: PurposeType) -> f64 {
    PURPOSE_WEIGHTS.get(&purpose).copied().unwrap_or(0.5) * 100.0
}

/// Combinación ponderada, redondeada y recortada a [0, 100]
pub fn compute_score(
    ownership_percent: f64,
    usage_hours: f64,
    lead: Duration,
    purpose: PurposeType,
) -> i32 {
    let total = ownership_score(ownership_percent) * OWNERSHIP_WEIGHT
        + usage_score(usage_hours) * USAGE_WEIGHT
        + lead_time_score(lead) * LEAD_TIME_WEIGHT
        + purpose_score(purpose) * PURPOSE_WEIGHT;

    (total.round() as i32).clamp(0, 100)
}

/// Servicio de scoring: resuelve las señales y delega en compute_score
pub struct PriorityService {
    bookings: BookingRepository,
    membership: MembershipService,
    clock: SharedClock,
}

impl PriorityService {
    pub fn new(pool: PgPool, membership: MembershipService, clock: SharedClock) -> Self {
        Self {
            bookings: BookingRepository::new(pool),
            membership,
            clock,
        }
    }

    /// Score de una reserva candidata. Nunca falla: cualquier error
    /// upstream degrada al neutro 50.
    pub async fn score_booking(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        start_time: DateTime<Utc>,
        purpose_type: PurposeType,
    ) -> i32 {
        let now = self.clock.now();

        let membership = match self.membership.get_membership(group_id, user_id).await {
            Ok(m) => m,
            Err(e) => {
                log::warn!(
                    "⚠️ Membership no disponible para user {} en grupo {}: {} - score neutro",
                    user_id,
                    group_id,
                    e
                );
                return NEUTRAL_SCORE;
            }
        };

        let usage_hours = match self
            .bookings
            .usage_hours_since(user_id, group_id, now - Duration::days(30))
            .await
        {
            Ok(h) => h,
            Err(e) => {
                log::warn!(
                    "⚠️ Uso reciente no disponible para user {}: {} - score neutro",
                    user_id,
                    e
                );
                return NEUTRAL_SCORE;
            }
        };

        let score = compute_score(
            membership.ownership_percent,
            usage_hours,
            start_time - now,
            purpose_type,
        );

        log::debug!(
            "🎯 Score {} para user {} (ownership {:.1}%, uso {:.1}h)",
            score,
            user_id,
            membership.ownership_percent,
            usage_hours
        );

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_half_owner_no_usage_ten_days_business_scores_80() {
        // 50% ownership, cero uso, 10 días de antelación, propósito business:
        // round(50*0.4 + 100*0.3 + 100*0.2 + 100*0.1) = 80
        let score = compute_score(50.0, 0.0, Duration::days(10), PurposeType::Business);
        assert_eq!(score, 80);
    }

    #[test]
    fn test_score_is_deterministic() {
        let a = compute_score(33.3, 12.5, Duration::hours(30), PurposeType::Family);
        let b = compute_score(33.3, 12.5, Duration::hours(30), PurposeType::Family);
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_bounds_for_extreme_inputs() {
        // Entradas extremas: el resultado siempre queda en [0, 100]
        let cases = [
            (0.0, 1000.0, Duration::minutes(5), PurposeType::Other),
            (100.0, 0.0, Duration::days(30), PurposeType::Emergency),
            (-50.0, -10.0, Duration::zero(), PurposeType::Personal),
            (250.0, 0.0, Duration::days(365), PurposeType::Business),
        ];
        for (ownership, usage, lead, purpose) in cases {
            let score = compute_score(ownership, usage, lead, purpose);
            assert!((0..=100).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn test_lead_time_tiers() {
        assert_eq!(lead_time_score(Duration::hours(1)), 20.0);
        assert_eq!(lead_time_score(Duration::hours(2)), 20.0);
        assert_eq!(lead_time_score(Duration::hours(12)), 50.0);
        assert_eq!(lead_time_score(Duration::hours(24)), 50.0);
        assert_eq!(lead_time_score(Duration::days(3)), 80.0);
        assert_eq!(lead_time_score(Duration::days(7)), 80.0);
        assert_eq!(lead_time_score(Duration::days(8)), 100.0);
    }

    #[test]
    fn test_usage_score_floors_at_zero() {
        assert_eq!(usage_score(0.0), 100.0);
        assert_eq!(usage_score(10.0), 80.0);
        assert_eq!(usage_score(50.0), 0.0);
        assert_eq!(usage_score(80.0), 0.0);
    }

    #[test]
    fn test_purpose_weights() {
        assert_eq!(purpose_score(PurposeType::Business), 100.0);
        assert_eq!(purpose_score(PurposeType::Emergency), 120.0);
        assert_eq!(purpose_score(PurposeType::Family), 80.0);
        assert_eq!(purpose_score(PurposeType::Personal), 60.0);
        assert_eq!(purpose_score(PurposeType::Other), 50.0);
    }

    #[test]
    fn test_emergency_can_push_score_past_plain_hundred_but_clamps() {
        // Emergency con todo al máximo: 100*0.4 + 100*0.3 + 100*0.2 + 120*0.1
        // = 102 → recortado a 100
        let score = compute_score(100.0, 0.0, Duration::days(10), PurposeType::Emergency);
        assert_eq!(score, 100);
    }
}
