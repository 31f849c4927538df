//! Job de warmup de cache
//!
//! Precalcula los calendarios de disponibilidad de los próximos días para
//! los vehículos activos, de modo que las consultas calientes lleguen con
//! la cache poblada. Corre como caller interno: sin semántica de usuario.

use chrono::Duration;
use futures::future::join_all;
use std::collections::HashSet;

use crate::repositories::vehicle_repository::VehicleRepository;
use crate::state::AppState;

pub async fn run(state: AppState) -> anyhow::Result<String> {
    let vehicles = VehicleRepository::new(state.pool.clone());
    let availability = state.availability_service();

    let now = state.clock.now();
    let until = now + Duration::days(state.policy.warmup_days);

    let active = vehicles.find_active().await?;
    let total = active.len();

    let results = join_all(
        active
            .iter()
            .map(|v| availability.get_vehicle_calendar(v.id, now, until)),
    )
    .await;

    let mut warmed = 0;
    for (vehicle, result) in active.iter().zip(results) {
        match result {
            Ok(_) => warmed += 1,
            Err(e) => log::warn!("⚠️ Warmup falló para vehículo {}: {}", vehicle.id, e),
        }
    }

    let groups: HashSet<_> = active.iter().map(|v| v.group_id).collect();
    let group_results = join_all(
        groups
            .iter()
            .map(|g| availability.get_group_calendar(*g, now, until)),
    )
    .await;

    let group_warmed = group_results.iter().filter(|r| r.is_ok()).count();

    Ok(format!(
        "{}/{} vehículos y {}/{} grupos precalentados",
        warmed,
        total,
        group_warmed,
        groups.len()
    ))
}
