// Runs the booking flows against a real MySQL server. Every test is skipped
// unless TEST_DATABASE_URL is set.
use async_trait::async_trait;
use cinema_booking_system::{
    models::booking::BookingStatus,
    store::MySqlStore,
    utils::error::AppError,
};
use ctor::dtor;
use sqlx::mysql::MySqlPool as Pool;
use std::sync::Arc;
use test_context::{test_context, AsyncTestContext};
use tokio::task::JoinSet;

mod common {
    pub mod test_utils;
}
use common::test_utils::{Fixture, TestDb};

struct MySqlStoreContext {
    pool: Option<Pool>,
    fixture: Option<Fixture>,
}

#[dtor]
fn cleanup() {
    if let Err(e) = TestDb::cleanup_database_sync() {
        eprintln!("Failed to cleanup test database: {}", e);
    }
}

#[async_trait]
impl AsyncTestContext for MySqlStoreContext {
    async fn setup() -> Self {
        let pool = TestDb::get_instance(file!())
            .await
            .expect("Failed to get test database instance");

        let fixture = pool
            .clone()
            .map(|pool| Fixture::with_store(Arc::new(MySqlStore::new(pool))));

        MySqlStoreContext { pool, fixture }
    }

    async fn teardown(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}

#[test_context(MySqlStoreContext)]
#[tokio::test]
async fn test_mysql_hall_scenario(ctx: &MySqlStoreContext) -> Result<(), AppError> {
    let Some(f) = &ctx.fixture else {
        return Ok(());
    };
    let (screen_id, showtime_id) = f.hall(12, 6).await?;
    let a1_a2 = f.seat_ids(screen_id, &["A1", "A2"]).await?;
    let a2_a3 = f.seat_ids(screen_id, &["A2", "A3"]).await?;

    let first = f.bookings.create_booking(1, showtime_id, &a1_a2).await?;

    assert_eq!(
        f.bookings.create_booking(2, showtime_id, &a2_a3).await,
        Err(AppError::SeatConflict(vec![a1_a2[1]]))
    );

    let cancelled = f.bookings.cancel_booking(1, first.booking_id).await?;
    assert_eq!(cancelled.released_seats, 2);

    let again = f.bookings.cancel_booking(1, first.booking_id).await?;
    assert!(again.already_cancelled);
    assert_eq!(again.released_seats, 0);

    f.bookings.create_booking(2, showtime_id, &a2_a3).await?;
    assert_eq!(f.showtimes.active_seat_ids(showtime_id).await?, a2_a3);

    let stored = f.store.booking(first.booking_id).await?.unwrap();
    assert_eq!(stored.status(), BookingStatus::Cancelled);

    Ok(())
}

#[test_context(MySqlStoreContext)]
#[tokio::test]
async fn test_mysql_seat_map_orders_rows_past_z(ctx: &MySqlStoreContext) -> Result<(), AppError> {
    let Some(f) = &ctx.fixture else {
        return Ok(());
    };
    let screen_id = f.screen("Corridor", 28, 1).await?;

    let seat_map = f.screens.build_seat_map(screen_id).await?;
    let labels: Vec<&str> = seat_map.rows.iter().map(|row| row.label.as_str()).collect();
    assert_eq!(labels.len(), 28);
    assert_eq!(&labels[24..], &["Y", "Z", "AA", "AB"]);

    Ok(())
}

#[test_context(MySqlStoreContext)]
#[tokio::test]
async fn test_mysql_dropped_transaction_rolls_back(ctx: &MySqlStoreContext) -> Result<(), AppError> {
    let Some(f) = &ctx.fixture else {
        return Ok(());
    };

    let screen_id = {
        let mut tx = f.store.begin().await?;
        tx.insert_screen("Never committed", 1).await?
    };

    assert!(f.store.screen(screen_id).await?.is_none());
    Ok(())
}

#[test_context(MySqlStoreContext)]
#[tokio::test]
async fn test_mysql_concurrent_overlapping_bookings(
    ctx: &MySqlStoreContext,
) -> Result<(), AppError> {
    let Some(f) = &ctx.fixture else {
        return Ok(());
    };
    let (screen_id, showtime_id) = f.hall(20, 10).await?;
    let contested = f.seat_ids(screen_id, &["A1", "A2"]).await?;
    let num_users = 8;

    let mut join_set = JoinSet::new();
    for user_id in 1..=num_users {
        let booking_service = f.bookings.clone();
        let label = format!("B{}", user_id);
        let mut wanted = f.seat_ids(screen_id, &[label.as_str()]).await?;
        wanted.extend(&contested);
        join_set.spawn(async move {
            booking_service.create_booking(user_id, showtime_id, &wanted).await
        });
    }

    let mut successful_bookings = 0;
    let mut conflicts = 0;
    while let Some(result) = join_set.join_next().await {
        match result.unwrap() {
            Ok(_) => successful_bookings += 1,
            Err(AppError::SeatConflict(_)) => conflicts += 1,
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    assert_eq!(successful_bookings, 1);
    assert_eq!(conflicts, num_users - 1);
    assert_eq!(f.showtimes.active_seat_ids(showtime_id).await?.len(), 3);

    Ok(())
}

#[test_context(MySqlStoreContext)]
#[tokio::test]
async fn test_mysql_history_and_delete_showtime(ctx: &MySqlStoreContext) -> Result<(), AppError> {
    let Some(f) = &ctx.fixture else {
        return Ok(());
    };
    let (screen_id, showtime_id) = f.hall(30, 10).await?;
    let seats = f.seat_ids(screen_id, &["C10", "A2", "B1"]).await?;
    // User ids are not shared with the other tests in this database
    let user_id = 9000 + screen_id;

    let booking = f.bookings.create_booking(user_id, showtime_id, &seats).await?;

    let history = f.bookings.bookings_for_user(user_id).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].booking_id, booking.booking_id);
    assert_eq!(history[0].seats, vec!["A2", "B1", "C10"]);
    assert_eq!(history[0].booking_status, BookingStatus::Active);

    assert_eq!(f.showtimes.delete_showtime(showtime_id).await?, 1);
    assert!(f.store.booking(booking.booking_id).await?.is_none());
    assert!(f.bookings.bookings_for_user(user_id).await?.is_empty());
    assert!(matches!(
        f.showtimes.delete_showtime(showtime_id).await,
        Err(AppError::NotFound(_))
    ));

    Ok(())
}

#[test_context(MySqlStoreContext)]
#[tokio::test]
async fn test_mysql_delete_movie_cascades(ctx: &MySqlStoreContext) -> Result<(), AppError> {
    let Some(f) = &ctx.fixture else {
        return Ok(());
    };
    let (screen_id, showtime_id) = f.hall(6, 3).await?;
    let seats = f.seat_ids(screen_id, &["A1"]).await?;
    let movie_id = f.showtimes.get_showtime(showtime_id).await?.movie_id;
    let user_id = 9500 + screen_id;

    let booking = f.bookings.create_booking(user_id, showtime_id, &seats).await?;

    assert_eq!(f.showtimes.delete_movie(movie_id).await?, 1);
    assert!(f.store.movie(movie_id).await?.is_none());
    assert!(f.store.showtime(showtime_id).await?.is_none());
    assert!(f.store.booking(booking.booking_id).await?.is_none());
    assert!(f.showtimes.active_seat_ids(showtime_id).await?.is_empty());
    assert!(matches!(
        f.showtimes.delete_movie(movie_id).await,
        Err(AppError::NotFound(_))
    ));

    Ok(())
}
