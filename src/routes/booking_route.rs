use crate::models::booking::{BookingHistoryResponse, BookingRequest, BookingResponse, CancelResponse};
use crate::services::booking_service::BookingService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

/// Book seats for a showtime
#[openapi(tag = "Bookings")]
#[post("/bookings", format = "json", data = "<request>")]
pub async fn create_booking(
    request: Json<BookingRequest>,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingResponse>, AppError> {
    let request = request.into_inner();
    let response = booking_service
        .create_booking(auth.user_id, request.showtime_id, &request.seat_ids)
        .await?;
    Ok(Json(response))
}

/// Booking history of the signed-in user
#[openapi(tag = "Bookings")]
#[get("/bookings")]
pub async fn get_history(
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingHistoryResponse>, AppError> {
    let bookings = booking_service.bookings_for_user(auth.user_id).await?;
    Ok(Json(BookingHistoryResponse { bookings }))
}

/// Cancel one of your bookings
#[openapi(tag = "Bookings")]
#[post("/bookings/<booking_id>/cancel")]
pub async fn cancel_booking(
    booking_id: i32,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<CancelResponse>, AppError> {
    let response = booking_service.cancel_booking(auth.user_id, booking_id).await?;
    Ok(Json(response))
}

/// Active bookings for upcoming shows
#[openapi(tag = "Admin")]
#[get("/admin/bookings?<from>")]
pub async fn list_active_bookings(
    from: Option<String>,
    _admin: AdminUser,
    booking_service: &State<BookingService>,
) -> Result<Json<BookingHistoryResponse>, AppError> {
    let from = super::from_date(from)?;
    let bookings = booking_service.active_bookings(from).await?;
    Ok(Json(BookingHistoryResponse { bookings }))
}

/// Cancel any booking
#[openapi(tag = "Admin")]
#[post("/admin/bookings/<booking_id>/cancel")]
pub async fn admin_cancel_booking(
    booking_id: i32,
    admin: AdminUser,
    booking_service: &State<BookingService>,
) -> Result<Json<CancelResponse>, AppError> {
    tracing::info!(admin_id = admin.user_id, booking_id, "admin cancellation requested");
    let response = booking_service.admin_cancel_booking(booking_id).await?;
    Ok(Json(response))
}
