#[macro_use]
extern crate rocket;

pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod swagger;
pub mod utils;

use std::sync::Arc;

use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::make_swagger_ui;

use crate::config::JwtConfig;
use crate::services::booking_service::BookingService;
use crate::services::screen_service::ScreenService;
use crate::services::showtime_service::ShowtimeService;
use crate::store::BookingStore;
use crate::swagger::swagger_ui;

// Assemble the HTTP application around an already connected store
pub fn build_rocket(store: Arc<dyn BookingStore>, jwt: JwtConfig) -> Rocket<Build> {
    let screen_service = ScreenService::new(store.clone());
    let showtime_service = ShowtimeService::new(store.clone());
    let booking_service = BookingService::new(store);

    rocket::build()
        .manage(jwt)
        .manage(screen_service)
        .manage(showtime_service)
        .manage(booking_service)
        .mount(
            "/api",
            openapi_get_routes![
                routes::screen_route::create_screen,
                routes::screen_route::get_seat_map,
                routes::showtime_route::create_movie,
                routes::showtime_route::update_movie,
                routes::showtime_route::delete_movie,
                routes::showtime_route::list_movies,
                routes::showtime_route::get_movie,
                routes::showtime_route::create_showtime,
                routes::showtime_route::update_showtime,
                routes::showtime_route::list_showtimes,
                routes::showtime_route::delete_showtime,
                routes::showtime_route::get_showtime,
                routes::showtime_route::get_seat_selection,
                routes::booking_route::create_booking,
                routes::booking_route::get_history,
                routes::booking_route::cancel_booking,
                routes::booking_route::list_active_bookings,
                routes::booking_route::admin_cancel_booking,
            ],
        )
        .mount("/swagger", make_swagger_ui(&swagger_ui()))
        .attach(AdHoc::on_response("CORS", |_, res| {
            Box::pin(async move {
                res.set_header(rocket::http::Header::new(
                    "Access-Control-Allow-Origin",
                    "*",
                ));
            })
        }))
}
