use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::conflict_controller::ConflictController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::conflict_dto::{ConflictResponse, ResolveConflictRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_conflict_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_unresolved))
        .route("/:id/resolve", post(resolve_conflict))
}

async fn list_unresolved(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConflictResponse>>, AppError> {
    let controller = ConflictController::new(state);
    let response = controller.list_unresolved().await?;
    Ok(Json(response))
}

async fn resolve_conflict(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveConflictRequest>,
) -> Result<Json<ApiResponse<ConflictResponse>>, AppError> {
    let controller = ConflictController::new(state);
    let response = controller.resolve(id, request).await?;
    Ok(Json(response))
}
