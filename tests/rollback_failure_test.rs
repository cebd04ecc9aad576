// A store whose explicit rollbacks fail. The booking core must still report
// the outcome of the request rather than the rollback error.
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use cinema_booking_system::{
    models::booking::{Booking, BookingSummary},
    models::screen::{NewSeat, Screen, Seat},
    models::showtime::{CreateMovieRequest, CreateShowtimeRequest, Movie, Showtime, ShowtimeListing},
    store::{BookingStore, MemoryStore, StoreTx},
    utils::error::{AppError, AppResult},
};
use std::sync::Arc;
use test_context::{test_context, AsyncTestContext};

mod common {
    pub mod test_utils;
}
use common::test_utils::Fixture;

struct FailingRollbackStore {
    inner: MemoryStore,
}

struct FailingRollbackTx<'a> {
    inner: Box<dyn StoreTx + 'a>,
}

#[async_trait]
impl BookingStore for FailingRollbackStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx + '_>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingRollbackTx { inner }))
    }

    async fn screen(&self, screen_id: i32) -> AppResult<Option<Screen>> {
        self.inner.screen(screen_id).await
    }

    async fn seats_for_screen(&self, screen_id: i32) -> AppResult<Vec<Seat>> {
        self.inner.seats_for_screen(screen_id).await
    }

    async fn movie(&self, movie_id: i32) -> AppResult<Option<Movie>> {
        self.inner.movie(movie_id).await
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        self.inner.list_movies().await
    }

    async fn upcoming_showtimes(&self, from: NaiveDate) -> AppResult<Vec<ShowtimeListing>> {
        self.inner.upcoming_showtimes(from).await
    }

    async fn showtime(&self, showtime_id: i32) -> AppResult<Option<Showtime>> {
        self.inner.showtime(showtime_id).await
    }

    async fn active_seat_ids(&self, showtime_id: i32) -> AppResult<Vec<i32>> {
        self.inner.active_seat_ids(showtime_id).await
    }

    async fn booking(&self, booking_id: i32) -> AppResult<Option<Booking>> {
        self.inner.booking(booking_id).await
    }

    async fn bookings_for_user(&self, user_id: i32) -> AppResult<Vec<BookingSummary>> {
        self.inner.bookings_for_user(user_id).await
    }

    async fn active_bookings(&self, from: NaiveDate) -> AppResult<Vec<BookingSummary>> {
        self.inner.active_bookings(from).await
    }
}

#[async_trait]
impl<'a> StoreTx for FailingRollbackTx<'a> {
    async fn insert_screen(&mut self, name: &str, total_seats: i32) -> AppResult<i32> {
        self.inner.insert_screen(name, total_seats).await
    }

    async fn insert_seats(&mut self, screen_id: i32, seats: &[NewSeat]) -> AppResult<()> {
        self.inner.insert_seats(screen_id, seats).await
    }

    async fn screen_exists(&mut self, screen_id: i32) -> AppResult<bool> {
        self.inner.screen_exists(screen_id).await
    }

    async fn insert_movie(&mut self, movie: &CreateMovieRequest) -> AppResult<i32> {
        self.inner.insert_movie(movie).await
    }

    async fn movie_exists(&mut self, movie_id: i32) -> AppResult<bool> {
        self.inner.movie_exists(movie_id).await
    }

    async fn update_movie(&mut self, movie_id: i32, movie: &CreateMovieRequest) -> AppResult<()> {
        self.inner.update_movie(movie_id, movie).await
    }

    async fn delete_movie(&mut self, movie_id: i32) -> AppResult<Option<u64>> {
        self.inner.delete_movie(movie_id).await
    }

    async fn insert_showtime(&mut self, showtime: &CreateShowtimeRequest) -> AppResult<i32> {
        self.inner.insert_showtime(showtime).await
    }

    async fn update_showtime(&mut self, showtime_id: i32, showtime: &CreateShowtimeRequest) -> AppResult<()> {
        self.inner.update_showtime(showtime_id, showtime).await
    }

    async fn has_active_bookings(&mut self, showtime_id: i32) -> AppResult<bool> {
        self.inner.has_active_bookings(showtime_id).await
    }

    async fn lock_showtime(&mut self, showtime_id: i32) -> AppResult<Option<Showtime>> {
        self.inner.lock_showtime(showtime_id).await
    }

    async fn seats_on_screen(&mut self, screen_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        self.inner.seats_on_screen(screen_id, seat_ids).await
    }

    async fn conflicting_seats(&mut self, showtime_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        self.inner.conflicting_seats(showtime_id, seat_ids).await
    }

    async fn insert_booking(
        &mut self,
        user_id: i32,
        showtime_id: i32,
        created_at: NaiveDateTime,
    ) -> AppResult<i32> {
        self.inner.insert_booking(user_id, showtime_id, created_at).await
    }

    async fn insert_booking_seats(
        &mut self,
        booking_id: i32,
        showtime_id: i32,
        seat_ids: &[i32],
    ) -> AppResult<()> {
        self.inner
            .insert_booking_seats(booking_id, showtime_id, seat_ids)
            .await
    }

    async fn lock_booking(&mut self, booking_id: i32) -> AppResult<Option<Booking>> {
        self.inner.lock_booking(booking_id).await
    }

    async fn release_booking_seats(&mut self, booking_id: i32) -> AppResult<u64> {
        self.inner.release_booking_seats(booking_id).await
    }

    async fn mark_cancelled(&mut self, booking_id: i32) -> AppResult<()> {
        self.inner.mark_cancelled(booking_id).await
    }

    async fn delete_showtime(&mut self, showtime_id: i32) -> AppResult<Option<u64>> {
        self.inner.delete_showtime(showtime_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let FailingRollbackTx { inner } = *self;
        inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        // The wrapped transaction is discarded, but the caller hears a failure
        Err(AppError::TransactionFailure("rollback lost the connection".into()))
    }
}

struct RollbackFailureContext {
    fixture: Fixture,
}

#[async_trait]
impl AsyncTestContext for RollbackFailureContext {
    async fn setup() -> Self {
        let store = FailingRollbackStore {
            inner: MemoryStore::new(),
        };
        RollbackFailureContext {
            fixture: Fixture::with_store(Arc::new(store)),
        }
    }

    async fn teardown(self) {}
}

#[test_context(RollbackFailureContext)]
#[tokio::test]
async fn test_conflict_is_reported_when_rollback_fails(
    ctx: &RollbackFailureContext,
) -> Result<(), AppError> {
    let f = &ctx.fixture;
    let (screen_id, showtime_id) = f.hall(4, 4).await?;
    let seats = f.seat_ids(screen_id, &["A1", "A2"]).await?;

    f.bookings.create_booking(1, showtime_id, &seats[..1]).await?;

    assert_eq!(
        f.bookings.create_booking(2, showtime_id, &seats).await,
        Err(AppError::SeatConflict(vec![seats[0]]))
    );
    assert_eq!(f.showtimes.active_seat_ids(showtime_id).await?, vec![seats[0]]);

    Ok(())
}

#[test_context(RollbackFailureContext)]
#[tokio::test]
async fn test_repeated_cancel_succeeds_when_rollback_fails(
    ctx: &RollbackFailureContext,
) -> Result<(), AppError> {
    let f = &ctx.fixture;
    let (screen_id, showtime_id) = f.hall(4, 4).await?;
    let seats = f.seat_ids(screen_id, &["A3"]).await?;
    let booking = f.bookings.create_booking(1, showtime_id, &seats).await?;

    f.bookings.cancel_booking(1, booking.booking_id).await?;
    let again = f.bookings.cancel_booking(1, booking.booking_id).await?;

    assert!(again.already_cancelled);
    assert_eq!(again.released_seats, 0);

    Ok(())
}
