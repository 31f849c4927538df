//! Índice de disponibilidad
//!
//! Cálculo de solapamientos sobre reservas no canceladas con semántica de
//! intervalos semiabiertos, calendarios con slots libre/ocupado por día, y
//! cache read-through en Redis con TTL corto. La cache es solo una
//! optimización: cualquier miss o error cae a la consulta fresca.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::keys;
use crate::cache::redis_client::{CacheOperations, RedisClient};
use crate::models::booking::Booking;
use crate::repositories::booking_repository::BookingRepository;
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::utils::errors::{not_found_error, AppResult};

/// Solapamiento de intervalos semiabiertos [a1,a2) y [b1,b2):
/// hay solape sii a1 < b2 AND b1 < a2
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Intervalo dentro de un día del calendario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Slots libre/ocupado de un día
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlot {
    pub date: NaiveDate,
    pub busy: Vec<SlotInterval>,
    pub free: Vec<SlotInterval>,
}

/// Derivar los slots por día a partir de los intervalos ocupados.
/// Los intervalos se recortan al rango [from, to) y se fusionan los
/// solapados antes de calcular los huecos libres.
pub fn build_day_slots(
    intervals: &[(DateTime<Utc>, DateTime<Utc>)],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<DaySlot> {
    let mut days = Vec::new();
    if to <= from {
        return days;
    }

    let mut day = from.date_naive();
    let last_day = to.date_naive();

    while day <= last_day {
        let midnight = day
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let day_start = midnight.max(from);
        let day_end = (midnight + Duration::days(1)).min(to);
        if day_end <= day_start {
            day += Duration::days(1);
            continue;
        }

        // Recortar al día y ordenar
        let mut busy: Vec<SlotInterval> = intervals
            .iter()
            .filter(|(s, e)| intervals_overlap(*s, *e, day_start, day_end))
            .map(|(s, e)| SlotInterval {
                start: (*s).max(day_start),
                end: (*e).min(day_end),
            })
            .collect();
        busy.sort_by_key(|s| s.start);

        // Fusionar solapados
        let mut merged: Vec<SlotInterval> = Vec::new();
        for slot in busy {
            match merged.last_mut() {
                Some(last) if slot.start <= last.end => {
                    if slot.end > last.end {
                        last.end = slot.end;
                    }
                }
                _ => merged.push(slot),
            }
        }

        // Huecos libres entre ocupados
        let mut free = Vec::new();
        let mut cursor = day_start;
        for slot in &merged {
            if slot.start > cursor {
                free.push(SlotInterval {
                    start: cursor,
                    end: slot.start,
                });
            }
            cursor = slot.end;
        }
        if cursor < day_end {
            free.push(SlotInterval {
                start: cursor,
                end: day_end,
            });
        }

        days.push(DaySlot {
            date: day,
            busy: merged,
            free,
        });

        day += Duration::days(1);
    }

    days
}

/// Resultado de una consulta de disponibilidad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub reason: Option<String>,
    pub conflicting_booking_id: Option<Uuid>,
}

impl AvailabilityResult {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
            conflicting_booking_id: None,
        }
    }

    pub fn vehicle_unavailable(status: &str) -> Self {
        Self {
            available: false,
            reason: Some(format!("vehicle is not available (status: {})", status)),
            conflicting_booking_id: None,
        }
    }

    pub fn overlapping(booking_id: Uuid) -> Self {
        Self {
            available: false,
            reason: Some("vehicle already booked for this time range".to_string()),
            conflicting_booking_id: Some(booking_id),
        }
    }
}

/// Calendario de un vehículo o grupo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub bookings: Vec<Booking>,
    pub days: Vec<DaySlot>,
}

pub struct AvailabilityService {
    bookings: BookingRepository,
    vehicles: VehicleRepository,
    redis: RedisClient,
    cache_ttl: u64,
}

impl AvailabilityService {
    pub fn new(pool: PgPool, redis: RedisClient, cache_ttl: u64) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool),
            redis,
            cache_ttl,
        }
    }

    /// Disponible sii el vehículo está "available" y ninguna reserva activa
    /// solapa el rango. Solo se cachea la consulta sin exclusión.
    pub async fn check_availability(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booking: Option<Uuid>,
    ) -> AppResult<AvailabilityResult> {
        let cache_key = keys::availability_key(&vehicle_id, &keys::range_digest(&start, &end));

        if exclude_booking.is_none() {
            if let Ok(Some(cached)) = self.redis.get::<AvailabilityResult>(&cache_key).await {
                return Ok(cached);
            }
        }

        let vehicle = self
            .vehicles
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &vehicle_id))?;

        let result = if !vehicle.is_available() {
            AvailabilityResult::vehicle_unavailable(&vehicle.status)
        } else {
            let overlapping = self
                .bookings
                .find_overlapping(vehicle_id, start, end, exclude_booking)
                .await?;
            match overlapping.first() {
                Some(conflicting) => AvailabilityResult::overlapping(conflicting.id),
                None => AvailabilityResult::available(),
            }
        };

        if exclude_booking.is_none() {
            if let Err(e) = self.redis.set(&cache_key, &result, self.cache_ttl).await {
                log::warn!("⚠️ No se pudo cachear disponibilidad: {}", e);
            }
        }

        Ok(result)
    }

    /// Calendario del vehículo: reservas no canceladas + slots por día
    pub async fn get_vehicle_calendar(
        &self,
        vehicle_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Calendar> {
        let cache_key =
            keys::vehicle_calendar_key(&vehicle_id, &keys::range_digest(&from, &to));

        if let Ok(Some(cached)) = self.redis.get::<Calendar>(&cache_key).await {
            return Ok(cached);
        }

        // Verificar que el vehículo existe antes de derivar nada
        self.vehicles
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &vehicle_id))?;

        let bookings = self.bookings.find_in_range(vehicle_id, from, to).await?;
        let calendar = self.build_calendar(bookings, from, to);

        if let Err(e) = self.redis.set(&cache_key, &calendar, self.cache_ttl).await {
            log::warn!("⚠️ No se pudo cachear calendario de vehículo: {}", e);
        }

        Ok(calendar)
    }

    /// Calendario del grupo: reservas de todos sus vehículos
    pub async fn get_group_calendar(
        &self,
        group_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Calendar> {
        let cache_key = keys::group_calendar_key(&group_id, &keys::range_digest(&from, &to));

        if let Ok(Some(cached)) = self.redis.get::<Calendar>(&cache_key).await {
            return Ok(cached);
        }

        let bookings = self.bookings.find_group_in_range(group_id, from, to).await?;
        let calendar = self.build_calendar(bookings, from, to);

        if let Err(e) = self.redis.set(&cache_key, &calendar, self.cache_ttl).await {
            log::warn!("⚠️ No se pudo cachear calendario de grupo: {}", e);
        }

        Ok(calendar)
    }

    fn build_calendar(
        &self,
        bookings: Vec<Booking>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Calendar {
        let intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = bookings
            .iter()
            .map(|b| (b.start_time, b.end_time))
            .collect();
        let days = build_day_slots(&intervals, from, to);

        Calendar {
            from,
            to,
            bookings,
            days,
        }
    }

    /// Invalidar todas las entradas del vehículo y su grupo tras cualquier
    /// mutación de reserva. Idempotente: repetir la invalidación o invalidar
    /// claves inexistentes nunca es un error.
    pub async fn invalidate_for(&self, vehicle_id: Uuid, group_id: Uuid) {
        for prefix in keys::vehicle_invalidation_prefixes(&vehicle_id) {
            if let Err(e) = self.redis.delete_by_prefix(&prefix).await {
                log::warn!("⚠️ Invalidación de cache falló para {}: {}", prefix, e);
            }
        }
        let group_prefix = keys::group_invalidation_prefix(&group_id);
        if let Err(e) = self.redis.delete_by_prefix(&group_prefix).await {
            log::warn!("⚠️ Invalidación de cache falló para {}: {}", group_prefix, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_half_open_overlap_semantics() {
        // [09:00,11:00) vs [10:00,12:00): solapan
        assert!(intervals_overlap(t(9, 0), t(11, 0), t(10, 0), t(12, 0)));
        // [09:00,11:00) vs [11:00,13:00): contiguos, no solapan
        assert!(!intervals_overlap(t(9, 0), t(11, 0), t(11, 0), t(13, 0)));
        // Contenido
        assert!(intervals_overlap(t(9, 0), t(13, 0), t(10, 0), t(11, 0)));
        // Disjuntos
        assert!(!intervals_overlap(t(9, 0), t(10, 0), t(12, 0), t(13, 0)));
    }

    #[test]
    fn test_day_slots_free_and_busy() {
        let from = t(0, 0);
        let to = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap();
        let intervals = vec![(t(9, 0), t(11, 0)), (t(10, 0), t(12, 0)), (t(15, 0), t(16, 0))];

        let days = build_day_slots(&intervals, from, to);
        assert_eq!(days.len(), 1);

        let day = &days[0];
        // Los dos primeros intervalos se fusionan en [09:00,12:00)
        assert_eq!(day.busy.len(), 2);
        assert_eq!(day.busy[0].start, t(9, 0));
        assert_eq!(day.busy[0].end, t(12, 0));
        assert_eq!(day.busy[1].start, t(15, 0));

        // Libres: [00:00,09:00), [12:00,15:00), [16:00,24:00)
        assert_eq!(day.free.len(), 3);
        assert_eq!(day.free[0].end, t(9, 0));
        assert_eq!(day.free[1], SlotInterval { start: t(12, 0), end: t(15, 0) });
        assert_eq!(day.free[2].start, t(16, 0));
    }

    #[test]
    fn test_day_slots_fully_free_day() {
        let from = t(0, 0);
        let to = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap();
        let days = build_day_slots(&[], from, to);
        assert_eq!(days.len(), 1);
        assert!(days[0].busy.is_empty());
        assert_eq!(days[0].free.len(), 1);
        assert_eq!(days[0].free[0], SlotInterval { start: from, end: to });
    }

    #[test]
    fn test_day_slots_empty_range() {
        assert!(build_day_slots(&[], t(12, 0), t(12, 0)).is_empty());
        assert!(build_day_slots(&[], t(12, 0), t(9, 0)).is_empty());
    }

    #[test]
    fn test_day_slots_span_multiple_days() {
        let from = t(0, 0);
        let to = Utc.with_ymd_and_hms(2026, 3, 13, 0, 0, 0).unwrap();
        // Reserva que cruza medianoche del día 10 al 11
        let intervals = vec![(
            t(22, 0),
            Utc.with_ymd_and_hms(2026, 3, 11, 2, 0, 0).unwrap(),
        )];
        let days = build_day_slots(&intervals, from, to);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].busy.len(), 1);
        assert_eq!(days[0].busy[0].end, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(days[1].busy.len(), 1);
        assert_eq!(days[1].busy[0].start, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
        assert!(days[2].busy.is_empty());
    }
}
