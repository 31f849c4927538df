use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::booking_controller::BookingController;
use crate::controllers::check_controller::{CheckController, CheckOutResult};
use crate::dto::booking_dto::{
    AvailabilityQuery, BookingResponse, CalendarQuery, CancelBookingRequest,
    ConfirmBookingRequest, CreateBookingRequest, ExtendBookingRequest, UpdateBookingRequest,
};
use crate::dto::check_dto::{CheckInRequest, CheckLogResponse, CheckOutRequest};
use crate::dto::common_dto::ApiResponse;
use crate::services::availability_service::{AvailabilityResult, Calendar};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_booking_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/availability", get(check_availability))
        .route("/calendar/vehicle/:vehicle_id", get(vehicle_calendar))
        .route("/calendar/group/:group_id", get(group_calendar))
        .route("/user/:user_id", get(list_user_bookings))
        .route("/:id", get(get_booking))
        .route("/:id", put(update_booking))
        .route("/:id/cancel", post(cancel_booking))
        .route("/:id/extend", post(extend_booking))
        .route("/:id/confirm", post(confirm_booking))
        .route("/:id/check-in", post(check_in))
        .route("/:id/check-out", post(check_out))
        .route("/:id/logs", get(check_logs))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(state);
    let response = controller.create(request).await?;
    Ok(Json(response))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let controller = BookingController::new(state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn list_user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let controller = BookingController::new(state);
    let response = controller.list_by_user(user_id).await?;
    Ok(Json(response))
}

async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(state);
    let response = controller.update(id, request).await?;
    Ok(Json(response))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(state);
    let response = controller.cancel(id, request).await?;
    Ok(Json(response))
}

async fn extend_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExtendBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(state);
    let response = controller.extend(id, request).await?;
    Ok(Json(response))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(state);
    let response = controller.confirm(id, request).await?;
    Ok(Json(response))
}

async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResult>, AppError> {
    let controller = BookingController::new(state);
    let response = controller
        .check_availability(query.vehicle_id, query.start_time, query.end_time)
        .await?;
    Ok(Json(response))
}

async fn vehicle_calendar(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Calendar>, AppError> {
    let controller = BookingController::new(state);
    let response = controller
        .vehicle_calendar(vehicle_id, query.from, query.to)
        .await?;
    Ok(Json(response))
}

async fn group_calendar(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Calendar>, AppError> {
    let controller = BookingController::new(state);
    let response = controller
        .group_calendar(group_id, query.from, query.to)
        .await?;
    Ok(Json(response))
}

async fn check_in(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<ApiResponse<CheckLogResponse>>, AppError> {
    let controller = CheckController::new(state);
    let response = controller.check_in(id, request).await?;
    Ok(Json(response))
}

async fn check_out(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CheckOutRequest>,
) -> Result<Json<ApiResponse<CheckOutResult>>, AppError> {
    let controller = CheckController::new(state);
    let response = controller.check_out(id, request).await?;
    Ok(Json(response))
}

async fn check_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CheckLogResponse>>, AppError> {
    let controller = CheckController::new(state);
    let response = controller.logs(id).await?;
    Ok(Json(response))
}
