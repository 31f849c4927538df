//! Controller de Vehicles
//!
//! Superficie de lectura del estado del vehículo y cambio manual de
//! estado por roles elevados.

use uuid::Uuid;

use crate::dto::common_dto::ApiResponse;
use crate::dto::vehicle_dto::{UpdateVehicleStatusRequest, VehicleResponse};
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, permission_error, AppError, AppResult};

pub struct VehicleController {
    state: AppState,
}

impl VehicleController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn repository(&self) -> VehicleRepository {
        VehicleRepository::new(self.state.pool.clone())
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<VehicleResponse> {
        let vehicle = self
            .repository()
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id))?;

        Ok(vehicle.into())
    }

    pub async fn list_by_group(&self, group_id: Uuid) -> AppResult<Vec<VehicleResponse>> {
        let vehicles = self.repository().find_by_group(group_id).await?;
        Ok(vehicles.into_iter().map(VehicleResponse::from).collect())
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        request: UpdateVehicleStatusRequest,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        let caller = request.caller.to_context();
        if !caller.is_elevated() {
            return Err(permission_error("change vehicle status"));
        }

        let allowed = ["available", "in_use", "maintenance", "retired"];
        if !allowed.contains(&request.status.as_str()) {
            return Err(AppError::Validation(vec![
                crate::utils::errors::RuleViolation::new(
                    "status",
                    "enum",
                    format!("status must be one of {:?}", allowed),
                ),
            ]));
        }

        self.repository()
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id))?;

        let vehicle = self.repository().set_status(id, &request.status).await?;

        // El cambio de estado afecta a la disponibilidad cacheada
        self.state
            .availability_service()
            .invalidate_for(vehicle.id, vehicle.group_id)
            .await;

        Ok(ApiResponse::success_with_message(
            vehicle.into(),
            "Vehicle status updated".to_string(),
        ))
    }
}
