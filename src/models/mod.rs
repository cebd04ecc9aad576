pub mod booking;
pub mod screen;
pub mod showtime;
