//! Controller de Bookings
//!
//! Orquestación fina entre las rutas y el BookingService: validación de
//! shape del request, construcción del CallerContext y mapeo a DTOs.

use uuid::Uuid;
use validator::Validate;

use crate::dto::booking_dto::{
    BookingResponse, CancelBookingRequest, ConfirmBookingRequest, CreateBookingRequest,
    ExtendBookingRequest, UpdateBookingRequest,
};
use crate::dto::common_dto::ApiResponse;
use crate::services::availability_service::{AvailabilityResult, Calendar};
use crate::state::AppState;
use crate::utils::errors::AppResult;
use chrono::{DateTime, Utc};

pub struct BookingController {
    state: AppState,
}

impl BookingController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn create(
        &self,
        request: CreateBookingRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        request.validate()?;

        let caller = request.caller.to_context();
        let service = self.state.booking_service();
        let booking = service.create_booking(caller, &request).await?;

        let message = if booking.auto_confirmed {
            "Booking created and auto-confirmed".to_string()
        } else {
            format!("Booking created ({})", booking.status)
        };

        Ok(ApiResponse::success_with_message(booking.into(), message))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookingResponse> {
        let booking = self.state.booking_service().get_booking(id).await?;
        Ok(booking.into())
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<BookingResponse>> {
        let bookings = self
            .state
            .booking_service()
            .list_user_bookings(user_id, 100)
            .await?;
        Ok(bookings.into_iter().map(BookingResponse::from).collect())
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateBookingRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        request.validate()?;

        let caller = request.caller.to_context();
        let booking = self
            .state
            .booking_service()
            .update_booking(id, caller, &request)
            .await?;

        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking updated".to_string(),
        ))
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        request: CancelBookingRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        request.validate()?;

        let caller = request.caller.to_context();
        let booking = self
            .state
            .booking_service()
            .cancel_booking(id, caller, &request)
            .await?;

        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking cancelled".to_string(),
        ))
    }

    pub async fn extend(
        &self,
        id: Uuid,
        request: ExtendBookingRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        let caller = request.caller.to_context();
        let booking = self
            .state
            .booking_service()
            .extend_booking(id, caller, &request)
            .await?;

        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking extended".to_string(),
        ))
    }

    pub async fn confirm(
        &self,
        id: Uuid,
        request: ConfirmBookingRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        let caller = request.caller.to_context();
        let booking = self
            .state
            .booking_service()
            .confirm_booking(id, caller)
            .await?;

        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking confirmed".to_string(),
        ))
    }

    pub async fn check_availability(
        &self,
        vehicle_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> AppResult<AvailabilityResult> {
        self.state
            .availability_service()
            .check_availability(vehicle_id, start_time, end_time, None)
            .await
    }

    pub async fn vehicle_calendar(
        &self,
        vehicle_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Calendar> {
        self.state
            .availability_service()
            .get_vehicle_calendar(vehicle_id, from, to)
            .await
    }

    pub async fn group_calendar(
        &self,
        group_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Calendar> {
        self.state
            .availability_service()
            .get_group_calendar(group_id, from, to)
            .await
    }
}
