//! Claves de cache
//!
//! Construcción centralizada de claves con el prefijo del servicio, para
//! que la invalidación por prefijo y los tests usen exactamente el mismo
//! esquema. El rango temporal se reduce a un digest md5 para mantener las
//! claves cortas.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const NAMESPACE: &str = "carshare";

fn make_key(prefix: &str, identifier: &str) -> String {
    format!("{}:{}:{}", NAMESPACE, prefix, identifier)
}

/// Digest de un rango temporal para usar como sufijo de clave
pub fn range_digest(start: &DateTime<Utc>, end: &DateTime<Utc>) -> String {
    let raw = format!("{}|{}", start.timestamp(), end.timestamp());
    format!("{:x}", md5::compute(raw.as_bytes()))
}

pub fn availability_key(vehicle_id: &Uuid, range_digest: &str) -> String {
    make_key("availability", &format!("{}:{}", vehicle_id, range_digest))
}

pub fn vehicle_calendar_key(vehicle_id: &Uuid, range_digest: &str) -> String {
    make_key("calendar:vehicle", &format!("{}:{}", vehicle_id, range_digest))
}

pub fn group_calendar_key(group_id: &Uuid, range_digest: &str) -> String {
    make_key("calendar:group", &format!("{}:{}", group_id, range_digest))
}

/// Prefijos de invalidación: toda entrada del vehículo o grupo afectado
pub fn vehicle_invalidation_prefixes(vehicle_id: &Uuid) -> Vec<String> {
    vec![
        make_key("availability", &format!("{}:", vehicle_id)),
        make_key("calendar:vehicle", &format!("{}:", vehicle_id)),
    ]
}

pub fn group_invalidation_prefix(group_id: &Uuid) -> String {
    make_key("calendar:group", &format!("{}:", group_id))
}

pub fn lock_key(job_name: &str) -> String {
    make_key("lock", job_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_digest_is_deterministic() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();
        assert_eq!(range_digest(&start, &end), range_digest(&start, &end));
        let other_end = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_ne!(range_digest(&start, &end), range_digest(&start, &other_end));
    }

    #[test]
    fn test_invalidation_prefixes_cover_availability_keys() {
        let vehicle_id = Uuid::new_v4();
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();
        let key = availability_key(&vehicle_id, &range_digest(&start, &end));
        let prefixes = vehicle_invalidation_prefixes(&vehicle_id);
        assert!(prefixes.iter().any(|p| key.starts_with(p.as_str())));
    }

    #[test]
    fn test_lock_key_namespaced_per_job() {
        assert_eq!(lock_key("reminders"), "carshare:lock:reminders");
        assert_ne!(lock_key("reminders"), lock_key("retention"));
    }
}
