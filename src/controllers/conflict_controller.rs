//! Controller de Conflicts

use uuid::Uuid;
use validator::Validate;

use crate::dto::common_dto::ApiResponse;
use crate::dto::conflict_dto::{ConflictResponse, ResolveConflictRequest};
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct ConflictController {
    state: AppState,
}

impl ConflictController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn list_unresolved(&self) -> AppResult<Vec<ConflictResponse>> {
        let conflicts = self.state.conflict_service().list_unresolved(100).await?;
        Ok(conflicts.into_iter().map(ConflictResponse::from).collect())
    }

    pub async fn resolve(
        &self,
        id: Uuid,
        request: ResolveConflictRequest,
    ) -> AppResult<ApiResponse<ConflictResponse>> {
        request.validate()?;

        let caller = request.caller.to_context();
        let conflict = self
            .state
            .conflict_service()
            .resolve_manual(id, caller, &request.note)
            .await?;

        Ok(ApiResponse::success_with_message(
            conflict.into(),
            "Conflict resolved".to_string(),
        ))
    }
}
