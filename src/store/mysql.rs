use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::MySql;
use sqlx::{MySqlPool, QueryBuilder, Transaction};

use super::{BookingStore, StoreTx};
use crate::models::booking::{Booking, BookingStatus, BookingSummary};
use crate::models::screen::{seat_order, NewSeat, Screen, Seat};
use crate::models::showtime::{
    CreateMovieRequest, CreateShowtimeRequest, Movie, Showtime, ShowtimeListing,
};
use crate::utils::error::{AppError, AppResult};

// MySQL allows 65535 placeholders per statement; each seat binds three
const SEAT_INSERT_CHUNK: usize = 1000;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlStore { pool }
    }

    async fn summaries(&self, rows: Vec<SummaryRow>) -> AppResult<Vec<BookingSummary>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<MySql>::new(
            "SELECT bs.booking_id, s.seat_row, s.seat_number \
             FROM booking_seats bs JOIN seats s ON s.seat_id = bs.seat_id \
             WHERE bs.booking_id IN (",
        );
        let mut ids = query.separated(", ");
        for row in &rows {
            ids.push_bind(row.booking_id);
        }
        ids.push_unseparated(")");

        let seat_rows: Vec<(i32, String, i32)> = query.build_query_as().fetch_all(&self.pool).await?;

        let mut seats_by_booking: HashMap<i32, Vec<(String, i32)>> = HashMap::new();
        for (booking_id, row, number) in seat_rows {
            seats_by_booking.entry(booking_id).or_default().push((row, number));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut seats = seats_by_booking.remove(&row.booking_id).unwrap_or_default();
                seats.sort_by_key(|(seat_row, number)| seat_order(seat_row, *number));
                row.into_summary(
                    seats
                        .into_iter()
                        .map(|(seat_row, number)| format!("{}{}", seat_row, number))
                        .collect(),
                )
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    booking_id: i32,
    user_id: i32,
    showtime_id: i32,
    movie_title: String,
    show_date: NaiveDate,
    show_time: NaiveTime,
    booked_at: NaiveDateTime,
    cancelled: bool,
}

impl SummaryRow {
    fn into_summary(self, seats: Vec<String>) -> BookingSummary {
        BookingSummary {
            booking_id: self.booking_id,
            user_id: self.user_id,
            showtime_id: self.showtime_id,
            movie_title: self.movie_title,
            show_date: self.show_date,
            show_time: self.show_time,
            booked_at: self.booked_at,
            seats,
            booking_status: if self.cancelled {
                BookingStatus::Cancelled
            } else {
                BookingStatus::Active
            },
        }
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT
        b.booking_id,
        b.user_id,
        b.showtime_id,
        m.title AS movie_title,
        st.show_date,
        st.show_time,
        b.booking_time AS booked_at,
        b.cancelled
    FROM bookings b
    JOIN showtimes st ON st.showtime_id = b.showtime_id
    JOIN movies m ON m.movie_id = st.movie_id
"#;

#[async_trait]
impl BookingStore for MySqlStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx + '_>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTx { tx }))
    }

    async fn screen(&self, screen_id: i32) -> AppResult<Option<Screen>> {
        let screen = sqlx::query_as::<_, Screen>(
            "SELECT screen_id AS id, screen_name AS name, total_seats FROM screens WHERE screen_id = ?",
        )
        .bind(screen_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(screen)
    }

    async fn seats_for_screen(&self, screen_id: i32) -> AppResult<Vec<Seat>> {
        let seats = sqlx::query_as::<_, Seat>(
            r#"
            SELECT seat_id AS id, screen_id, seat_row, seat_number AS number
            FROM seats
            WHERE screen_id = ?
            ORDER BY seat_id
            "#,
        )
        .bind(screen_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(seats)
    }

    async fn movie(&self, movie_id: i32) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            SELECT movie_id AS id, title, duration, rating, description, image_url
            FROM movies
            WHERE movie_id = ?
            "#,
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT movie_id AS id, title, duration, rating, description, image_url
            FROM movies
            ORDER BY movie_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn upcoming_showtimes(&self, from: NaiveDate) -> AppResult<Vec<ShowtimeListing>> {
        let listings = sqlx::query_as::<_, ShowtimeListing>(
            r#"
            SELECT
                st.showtime_id AS id,
                st.movie_id,
                m.title AS movie_title,
                st.screen_id,
                sc.screen_name,
                st.show_date,
                st.show_time,
                st.price
            FROM showtimes st
            JOIN movies m ON m.movie_id = st.movie_id
            JOIN screens sc ON sc.screen_id = st.screen_id
            WHERE st.show_date >= ?
            ORDER BY st.show_date, st.show_time, st.showtime_id
            "#,
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    async fn showtime(&self, showtime_id: i32) -> AppResult<Option<Showtime>> {
        let showtime = sqlx::query_as::<_, Showtime>(
            r#"
            SELECT showtime_id AS id, movie_id, screen_id, show_date, show_time, price
            FROM showtimes
            WHERE showtime_id = ?
            "#,
        )
        .bind(showtime_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(showtime)
    }

    async fn active_seat_ids(&self, showtime_id: i32) -> AppResult<Vec<i32>> {
        let seat_ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT bs.seat_id
            FROM booking_seats bs
            JOIN bookings b ON bs.booking_id = b.booking_id
            WHERE b.showtime_id = ? AND b.cancelled = FALSE
            ORDER BY bs.seat_id
            "#,
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(seat_ids)
    }

    async fn booking(&self, booking_id: i32) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT booking_id AS id, user_id, showtime_id, booking_time AS created_at, cancelled
            FROM bookings
            WHERE booking_id = ?
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn bookings_for_user(&self, user_id: i32) -> AppResult<Vec<BookingSummary>> {
        let sql = format!(
            "{} WHERE b.user_id = ? ORDER BY b.booking_time DESC, b.booking_id DESC",
            SUMMARY_SELECT
        );
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.summaries(rows).await
    }

    async fn active_bookings(&self, from: NaiveDate) -> AppResult<Vec<BookingSummary>> {
        let sql = format!(
            "{} WHERE st.show_date >= ? AND b.cancelled = FALSE \
             ORDER BY st.show_date, st.show_time, b.booking_id",
            SUMMARY_SELECT
        );
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(from)
            .fetch_all(&self.pool)
            .await?;
        self.summaries(rows).await
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

impl MySqlTx {
    async fn conflicts(&mut self, showtime_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        if seat_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Locking read: sees rows committed after this transaction started
        let mut query = QueryBuilder::<MySql>::new(
            "SELECT bs.seat_id FROM booking_seats bs \
             JOIN bookings b ON bs.booking_id = b.booking_id \
             WHERE b.showtime_id = ",
        );
        query.push_bind(showtime_id);
        query.push(" AND b.cancelled = FALSE AND bs.seat_id IN (");
        let mut ids = query.separated(", ");
        for seat_id in seat_ids {
            ids.push_bind(*seat_id);
        }
        ids.push_unseparated(") ORDER BY bs.seat_id FOR UPDATE");

        let conflicts = query.build_query_scalar::<i32>().fetch_all(&mut *self.tx).await?;
        Ok(conflicts)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl StoreTx for MySqlTx {
    async fn insert_screen(&mut self, name: &str, total_seats: i32) -> AppResult<i32> {
        let result = sqlx::query("INSERT INTO screens (screen_name, total_seats) VALUES (?, ?)")
            .bind(name)
            .bind(total_seats)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.last_insert_id() as i32)
    }

    async fn insert_seats(&mut self, screen_id: i32, seats: &[NewSeat]) -> AppResult<()> {
        for chunk in seats.chunks(SEAT_INSERT_CHUNK) {
            let mut query =
                QueryBuilder::<MySql>::new("INSERT INTO seats (screen_id, seat_row, seat_number) ");
            query.push_values(chunk, |mut row, seat| {
                row.push_bind(screen_id)
                    .push_bind(seat.row.as_str())
                    .push_bind(seat.number);
            });

            query.build().execute(&mut *self.tx).await.map_err(|err| {
                if is_unique_violation(&err) {
                    AppError::InvalidInput(format!("screen {} already has these seats", screen_id))
                } else {
                    AppError::from(err)
                }
            })?;
        }
        Ok(())
    }

    async fn screen_exists(&mut self, screen_id: i32) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM screens WHERE screen_id = ?")
        .bind(screen_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count > 0)
    }

    async fn insert_movie(&mut self, movie: &CreateMovieRequest) -> AppResult<i32> {
        let result = sqlx::query(
            r#"
            INSERT INTO movies (title, duration, rating, description, image_url)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&movie.title)
        .bind(movie.duration)
        .bind(&movie.rating)
        .bind(&movie.description)
        .bind(&movie.image_url)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    async fn movie_exists(&mut self, movie_id: i32) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM movies WHERE movie_id = ?")
        .bind(movie_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count > 0)
    }

    async fn update_movie(&mut self, movie_id: i32, movie: &CreateMovieRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE movies
            SET title = ?, duration = ?, rating = ?, description = ?, image_url = ?
            WHERE movie_id = ?
            "#,
        )
        .bind(&movie.title)
        .bind(movie.duration)
        .bind(&movie.rating)
        .bind(&movie.description)
        .bind(&movie.image_url)
        .bind(movie_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_movie(&mut self, movie_id: i32) -> AppResult<Option<u64>> {
        let found = sqlx::query_scalar::<_, i32>("SELECT movie_id FROM movies WHERE movie_id = ? FOR UPDATE")
            .bind(movie_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        if found.is_none() {
            return Ok(None);
        }

        // Booking writers lock showtime rows, so take them before any booking rows
        sqlx::query("SELECT showtime_id FROM showtimes WHERE movie_id = ? FOR UPDATE")
            .bind(movie_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query(
            "DELETE bs FROM booking_seats bs \
             JOIN showtimes st ON st.showtime_id = bs.showtime_id \
             WHERE st.movie_id = ?",
        )
        .bind(movie_id)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query(
            "DELETE b FROM bookings b \
             JOIN showtimes st ON st.showtime_id = b.showtime_id \
             WHERE st.movie_id = ?",
        )
        .bind(movie_id)
        .execute(&mut *self.tx)
        .await?;

        let showtimes = sqlx::query("DELETE FROM showtimes WHERE movie_id = ?")
            .bind(movie_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM movies WHERE movie_id = ?")
            .bind(movie_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(Some(showtimes.rows_affected()))
    }

    async fn insert_showtime(&mut self, showtime: &CreateShowtimeRequest) -> AppResult<i32> {
        let result = sqlx::query(
            r#"
            INSERT INTO showtimes (movie_id, screen_id, show_date, show_time, price)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(showtime.movie_id)
        .bind(showtime.screen_id)
        .bind(showtime.show_date)
        .bind(showtime.show_time)
        .bind(showtime.price)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    async fn update_showtime(&mut self, showtime_id: i32, showtime: &CreateShowtimeRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE showtimes
            SET movie_id = ?, screen_id = ?, show_date = ?, show_time = ?, price = ?
            WHERE showtime_id = ?
            "#,
        )
        .bind(showtime.movie_id)
        .bind(showtime.screen_id)
        .bind(showtime.show_date)
        .bind(showtime.show_time)
        .bind(showtime.price)
        .bind(showtime_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn has_active_bookings(&mut self, showtime_id: i32) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE showtime_id = ? AND cancelled = FALSE",
        )
        .bind(showtime_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count > 0)
    }

    async fn lock_showtime(&mut self, showtime_id: i32) -> AppResult<Option<Showtime>> {
        let showtime = sqlx::query_as::<_, Showtime>(
            r#"
            SELECT showtime_id AS id, movie_id, screen_id, show_date, show_time, price
            FROM showtimes
            WHERE showtime_id = ?
            FOR UPDATE
            "#,
        )
        .bind(showtime_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(showtime)
    }

    async fn seats_on_screen(&mut self, screen_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        if seat_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<MySql>::new("SELECT seat_id FROM seats WHERE screen_id = ");
        query.push_bind(screen_id);
        query.push(" AND seat_id IN (");
        let mut ids = query.separated(", ");
        for seat_id in seat_ids {
            ids.push_bind(*seat_id);
        }
        ids.push_unseparated(") ORDER BY seat_id");

        let found = query.build_query_scalar::<i32>().fetch_all(&mut *self.tx).await?;
        Ok(found)
    }

    async fn conflicting_seats(&mut self, showtime_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        self.conflicts(showtime_id, seat_ids).await
    }

    async fn insert_booking(
        &mut self,
        user_id: i32,
        showtime_id: i32,
        created_at: NaiveDateTime,
    ) -> AppResult<i32> {
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (user_id, showtime_id, booking_time, cancelled)
            VALUES (?, ?, ?, FALSE)
            "#,
        )
        .bind(user_id)
        .bind(showtime_id)
        .bind(created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    async fn insert_booking_seats(
        &mut self,
        booking_id: i32,
        showtime_id: i32,
        seat_ids: &[i32],
    ) -> AppResult<()> {
        let mut query =
            QueryBuilder::<MySql>::new("INSERT INTO booking_seats (booking_id, seat_id, showtime_id) ");
        query.push_values(seat_ids, |mut row, seat_id| {
            row.push_bind(booking_id)
                .push_bind(*seat_id)
                .push_bind(showtime_id);
        });

        match query.build().execute(&mut *self.tx).await {
            Ok(_) => Ok(()),
            // Backstop for writers that bypassed the showtime lock
            Err(err) if is_unique_violation(&err) => {
                let conflicts = self.conflicts(showtime_id, seat_ids).await?;
                Err(AppError::SeatConflict(if conflicts.is_empty() {
                    seat_ids.to_vec()
                } else {
                    conflicts
                }))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn lock_booking(&mut self, booking_id: i32) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT booking_id AS id, user_id, showtime_id, booking_time AS created_at, cancelled
            FROM bookings
            WHERE booking_id = ?
            FOR UPDATE
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(booking)
    }

    async fn release_booking_seats(&mut self, booking_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM booking_seats WHERE booking_id = ?")
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn mark_cancelled(&mut self, booking_id: i32) -> AppResult<()> {
        sqlx::query("UPDATE bookings SET cancelled = TRUE WHERE booking_id = ?")
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_showtime(&mut self, showtime_id: i32) -> AppResult<Option<u64>> {
        if self.lock_showtime(showtime_id).await?.is_none() {
            return Ok(None);
        }

        sqlx::query("DELETE FROM booking_seats WHERE showtime_id = ?")
            .bind(showtime_id)
            .execute(&mut *self.tx)
            .await?;

        let bookings = sqlx::query("DELETE FROM bookings WHERE showtime_id = ?")
            .bind(showtime_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM showtimes WHERE showtime_id = ?")
            .bind(showtime_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(Some(bookings.rows_affected()))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MySqlTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let MySqlTx { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
