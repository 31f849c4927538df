//! Controller de Check-in / Check-out

use uuid::Uuid;
use validator::Validate;

use crate::dto::check_dto::{CheckInRequest, CheckLogResponse, CheckOutRequest, UsageStats};
use crate::dto::common_dto::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct CheckController {
    state: AppState,
}

impl CheckController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn check_in(
        &self,
        booking_id: Uuid,
        request: CheckInRequest,
    ) -> AppResult<ApiResponse<CheckLogResponse>> {
        request.validate()?;

        let caller = request.caller.to_context();
        let log = self
            .state
            .check_service()
            .check_in(booking_id, caller, &request)
            .await?;

        Ok(ApiResponse::success_with_message(
            log.into(),
            "Check-in recorded".to_string(),
        ))
    }

    pub async fn check_out(
        &self,
        booking_id: Uuid,
        request: CheckOutRequest,
    ) -> AppResult<ApiResponse<CheckOutResult>> {
        request.validate()?;

        let caller = request.caller.to_context();
        let (log, stats) = self
            .state
            .check_service()
            .check_out(booking_id, caller, &request)
            .await?;

        Ok(ApiResponse::success_with_message(
            CheckOutResult {
                log: log.into(),
                stats,
            },
            "Check-out recorded".to_string(),
        ))
    }

    pub async fn logs(&self, booking_id: Uuid) -> AppResult<Vec<CheckLogResponse>> {
        let logs = self.state.check_service().get_logs(booking_id).await?;
        Ok(logs.into_iter().map(CheckLogResponse::from).collect())
    }
}

/// Registro + estadísticas derivadas del check-out
#[derive(Debug, serde::Serialize)]
pub struct CheckOutResult {
    pub log: CheckLogResponse,
    pub stats: UsageStats,
}
