//! Persistence boundary for the booking core.
//!
//! Services never open connections. They receive a [`BookingStore`] and run
//! every multi-row write inside a [`StoreTx`]. Two backends exist:
//! - [`MySqlStore`], the production store backed by an `sqlx` pool
//! - [`MemoryStore`], a single-process store guarded by a `tokio::sync::Mutex`
//!
//! A transaction that is dropped without `commit` is rolled back by both
//! backends, so an early `?` return can never leave partial rows behind.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::models::booking::{Booking, BookingSummary};
use crate::models::screen::{NewSeat, Screen, Seat};
use crate::models::showtime::{
    CreateMovieRequest, CreateShowtimeRequest, Movie, Showtime, ShowtimeListing,
};
use crate::utils::error::AppResult;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    /// Open a transaction. Writes become visible to other callers only after
    /// [`StoreTx::commit`].
    async fn begin(&self) -> AppResult<Box<dyn StoreTx + '_>>;

    async fn screen(&self, screen_id: i32) -> AppResult<Option<Screen>>;

    /// All seats of a screen. Order is unspecified; callers sort.
    async fn seats_for_screen(&self, screen_id: i32) -> AppResult<Vec<Seat>>;

    async fn movie(&self, movie_id: i32) -> AppResult<Option<Movie>>;

    /// Every movie, newest first.
    async fn list_movies(&self) -> AppResult<Vec<Movie>>;

    /// Showtimes on or after `from`, ordered by date and time.
    async fn upcoming_showtimes(&self, from: NaiveDate) -> AppResult<Vec<ShowtimeListing>>;

    async fn showtime(&self, showtime_id: i32) -> AppResult<Option<Showtime>>;

    /// Seats held by a non-cancelled booking for the showtime.
    async fn active_seat_ids(&self, showtime_id: i32) -> AppResult<Vec<i32>>;

    async fn booking(&self, booking_id: i32) -> AppResult<Option<Booking>>;

    /// The user's bookings, newest first.
    async fn bookings_for_user(&self, user_id: i32) -> AppResult<Vec<BookingSummary>>;

    /// Non-cancelled bookings for shows on or after `from`, ordered by show date and time.
    async fn active_bookings(&self, from: NaiveDate) -> AppResult<Vec<BookingSummary>>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn insert_screen(&mut self, name: &str, total_seats: i32) -> AppResult<i32>;

    /// Batch insert. Fails if any (screen, row, number) already exists.
    async fn insert_seats(&mut self, screen_id: i32, seats: &[NewSeat]) -> AppResult<()>;

    async fn screen_exists(&mut self, screen_id: i32) -> AppResult<bool>;

    async fn insert_movie(&mut self, movie: &CreateMovieRequest) -> AppResult<i32>;

    async fn movie_exists(&mut self, movie_id: i32) -> AppResult<bool>;

    async fn update_movie(&mut self, movie_id: i32, movie: &CreateMovieRequest) -> AppResult<()>;

    /// Remove a movie with its showtimes and their bookings. Returns the
    /// number of showtimes removed, or `None` if the movie does not exist.
    async fn delete_movie(&mut self, movie_id: i32) -> AppResult<Option<u64>>;

    async fn insert_showtime(&mut self, showtime: &CreateShowtimeRequest) -> AppResult<i32>;

    async fn update_showtime(&mut self, showtime_id: i32, showtime: &CreateShowtimeRequest) -> AppResult<()>;

    async fn has_active_bookings(&mut self, showtime_id: i32) -> AppResult<bool>;

    /// Read the showtime and lock it against concurrent booking writers until
    /// the transaction ends.
    async fn lock_showtime(&mut self, showtime_id: i32) -> AppResult<Option<Showtime>>;

    /// The subset of `seat_ids` that are seats of `screen_id`.
    async fn seats_on_screen(&mut self, screen_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>>;

    /// The subset of `seat_ids` held by an active booking for the showtime,
    /// read from the latest committed state.
    async fn conflicting_seats(&mut self, showtime_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>>;

    async fn insert_booking(
        &mut self,
        user_id: i32,
        showtime_id: i32,
        created_at: NaiveDateTime,
    ) -> AppResult<i32>;

    /// Fails with `SeatConflict` if an active booking already holds one of the seats.
    async fn insert_booking_seats(
        &mut self,
        booking_id: i32,
        showtime_id: i32,
        seat_ids: &[i32],
    ) -> AppResult<()>;

    async fn lock_booking(&mut self, booking_id: i32) -> AppResult<Option<Booking>>;

    /// Delete the booking's seat rows, returning how many were removed.
    async fn release_booking_seats(&mut self, booking_id: i32) -> AppResult<u64>;

    async fn mark_cancelled(&mut self, booking_id: i32) -> AppResult<()>;

    /// Remove a showtime with its bookings and booking seats. Returns the
    /// number of bookings removed, or `None` if the showtime does not exist.
    async fn delete_showtime(&mut self, showtime_id: i32) -> AppResult<Option<u64>>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
