use crate::models::booking::SeatSelectionResponse;
use crate::models::showtime::{
    CreateMovieRequest, CreateShowtimeRequest, CreatedResponse, Movie, Showtime, ShowtimeListing,
};
use crate::services::showtime_service::ShowtimeService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// Add a movie
#[openapi(tag = "Admin")]
#[post("/admin/movies", format = "json", data = "<request>")]
pub async fn create_movie(
    request: Json<CreateMovieRequest>,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<CreatedResponse>, AppError> {
    let id = showtime_service.create_movie(request.into_inner()).await?;
    Ok(Json(CreatedResponse { id }))
}

/// Edit a movie
#[openapi(tag = "Admin")]
#[put("/admin/movies/<movie_id>", format = "json", data = "<request>")]
pub async fn update_movie(
    movie_id: i32,
    request: Json<CreateMovieRequest>,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Movie>, AppError> {
    let movie = showtime_service.update_movie(movie_id, request.into_inner()).await?;
    Ok(Json(movie))
}

/// Delete a movie with its showtimes and their bookings
#[openapi(tag = "Admin")]
#[delete("/admin/movies/<movie_id>")]
pub async fn delete_movie(
    movie_id: i32,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Value>, AppError> {
    let removed = showtime_service.delete_movie(movie_id).await?;
    Ok(Json(json!({ "movie_id": movie_id, "showtimes_removed": removed })))
}

/// All movies, newest first
#[openapi(tag = "Movies")]
#[get("/movies")]
pub async fn list_movies(
    _auth: AuthenticatedUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Vec<Movie>>, AppError> {
    let movies = showtime_service.list_movies().await?;
    Ok(Json(movies))
}

/// Get a movie
#[openapi(tag = "Movies")]
#[get("/movies/<movie_id>")]
pub async fn get_movie(
    movie_id: i32,
    _auth: AuthenticatedUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Movie>, AppError> {
    let movie = showtime_service.get_movie(movie_id).await?;
    Ok(Json(movie))
}

/// Schedule a showtime for a movie on a screen
#[openapi(tag = "Admin")]
#[post("/admin/showtimes", format = "json", data = "<request>")]
pub async fn create_showtime(
    request: Json<CreateShowtimeRequest>,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<CreatedResponse>, AppError> {
    let id = showtime_service.create_showtime(request.into_inner()).await?;
    Ok(Json(CreatedResponse { id }))
}

/// Edit a showtime
#[openapi(tag = "Admin")]
#[put("/admin/showtimes/<showtime_id>", format = "json", data = "<request>")]
pub async fn update_showtime(
    showtime_id: i32,
    request: Json<CreateShowtimeRequest>,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Showtime>, AppError> {
    let showtime = showtime_service
        .update_showtime(showtime_id, request.into_inner())
        .await?;
    Ok(Json(showtime))
}

/// Delete a showtime and its bookings
#[openapi(tag = "Admin")]
#[delete("/admin/showtimes/<showtime_id>")]
pub async fn delete_showtime(
    showtime_id: i32,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Value>, AppError> {
    let removed = showtime_service.delete_showtime(showtime_id).await?;
    Ok(Json(json!({ "showtime_id": showtime_id, "bookings_removed": removed })))
}

/// Showtimes from a date onwards (default today)
#[openapi(tag = "Showtimes")]
#[get("/showtimes?<from>")]
pub async fn list_showtimes(
    from: Option<String>,
    _auth: AuthenticatedUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Vec<ShowtimeListing>>, AppError> {
    let from = super::from_date(from)?;
    let showtimes = showtime_service.upcoming_showtimes(from).await?;
    Ok(Json(showtimes))
}

/// Get a showtime
#[openapi(tag = "Showtimes")]
#[get("/showtimes/<showtime_id>")]
pub async fn get_showtime(
    showtime_id: i32,
    _auth: AuthenticatedUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Showtime>, AppError> {
    let showtime = showtime_service.get_showtime(showtime_id).await?;
    Ok(Json(showtime))
}

/// Seat map of a showtime with booked seats marked unavailable
#[openapi(tag = "Showtimes")]
#[get("/showtimes/<showtime_id>/seats")]
pub async fn get_seat_selection(
    showtime_id: i32,
    _auth: AuthenticatedUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<SeatSelectionResponse>, AppError> {
    let selection = showtime_service.seat_selection(showtime_id).await?;
    Ok(Json(selection))
}
