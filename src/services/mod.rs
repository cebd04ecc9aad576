pub mod booking_service;
pub mod screen_service;
pub mod showtime_service;
