use crate::models::screen::{CreateScreenRequest, CreateScreenResponse, SeatMap};
use crate::services::screen_service::ScreenService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

/// Create a screen and generate its seats
#[openapi(tag = "Admin")]
#[post("/admin/screens", format = "json", data = "<request>")]
pub async fn create_screen(
    request: Json<CreateScreenRequest>,
    _admin: AdminUser,
    screen_service: &State<ScreenService>,
) -> Result<Json<CreateScreenResponse>, AppError> {
    let response = screen_service.create_screen(request.into_inner()).await?;
    Ok(Json(response))
}

/// Seat layout of a screen, grouped by row
#[openapi(tag = "Screens")]
#[get("/screens/<screen_id>/seat-map")]
pub async fn get_seat_map(
    screen_id: i32,
    _auth: AuthenticatedUser,
    screen_service: &State<ScreenService>,
) -> Result<Json<SeatMap>, AppError> {
    let seat_map = screen_service.build_seat_map(screen_id).await?;
    Ok(Json(seat_map))
}
