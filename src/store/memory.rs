use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BookingStore, StoreTx};
use crate::models::booking::{Booking, BookingSeat, BookingSummary};
use crate::models::screen::{seat_order, NewSeat, Screen, Seat};
use crate::models::showtime::{
    CreateMovieRequest, CreateShowtimeRequest, Movie, Showtime, ShowtimeListing,
};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    screens: BTreeMap<i32, Screen>,
    seats: BTreeMap<i32, Seat>,
    movies: BTreeMap<i32, Movie>,
    showtimes: BTreeMap<i32, Showtime>,
    bookings: BTreeMap<i32, Booking>,
    booking_seats: Vec<BookingSeat>,
    last_id: i32,
}

impl Tables {
    // One sequence shared by every table, ids are never reused
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn active_seat_ids(&self, showtime_id: i32) -> Vec<i32> {
        let mut seat_ids: Vec<i32> = self
            .booking_seats
            .iter()
            .filter(|bs| bs.showtime_id == showtime_id)
            .filter(|bs| {
                self.bookings
                    .get(&bs.booking_id)
                    .map_or(false, |booking| !booking.cancelled)
            })
            .map(|bs| bs.seat_id)
            .collect();
        seat_ids.sort_unstable();
        seat_ids
    }

    // Drop a showtime with its bookings, returning how many bookings went
    fn remove_showtime(&mut self, showtime_id: i32) -> Option<u64> {
        self.showtimes.remove(&showtime_id)?;

        self.booking_seats.retain(|bs| bs.showtime_id != showtime_id);
        let before = self.bookings.len();
        self.bookings
            .retain(|_, booking| booking.showtime_id != showtime_id);
        Some((before - self.bookings.len()) as u64)
    }

    fn summary(&self, booking: &Booking) -> Option<BookingSummary> {
        let showtime = self.showtimes.get(&booking.showtime_id)?;
        let movie = self.movies.get(&showtime.movie_id)?;

        let mut seats: Vec<&Seat> = self
            .booking_seats
            .iter()
            .filter(|bs| bs.booking_id == booking.id)
            .filter_map(|bs| self.seats.get(&bs.seat_id))
            .collect();
        seats.sort_by_key(|seat| seat_order(&seat.seat_row, seat.number));

        Some(BookingSummary {
            booking_id: booking.id,
            user_id: booking.user_id,
            showtime_id: booking.showtime_id,
            movie_title: movie.title.clone(),
            show_date: showtime.show_date,
            show_time: showtime.show_time,
            booked_at: booking.created_at,
            seats: seats.iter().map(|seat| seat.label()).collect(),
            booking_status: booking.status(),
        })
    }
}

/// Single-process store. Transactions are serialised: a transaction holds
/// the lock from `begin` until commit, rollback or drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx + '_>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn screen(&self, screen_id: i32) -> AppResult<Option<Screen>> {
        Ok(self.tables.lock().await.screens.get(&screen_id).cloned())
    }

    async fn seats_for_screen(&self, screen_id: i32) -> AppResult<Vec<Seat>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .seats
            .values()
            .filter(|seat| seat.screen_id == screen_id)
            .cloned()
            .collect())
    }

    async fn movie(&self, movie_id: i32) -> AppResult<Option<Movie>> {
        Ok(self.tables.lock().await.movies.get(&movie_id).cloned())
    }

    async fn showtime(&self, showtime_id: i32) -> AppResult<Option<Showtime>> {
        Ok(self.tables.lock().await.showtimes.get(&showtime_id).cloned())
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let tables = self.tables.lock().await;
        Ok(tables.movies.values().rev().cloned().collect())
    }

    async fn upcoming_showtimes(&self, from: NaiveDate) -> AppResult<Vec<ShowtimeListing>> {
        let tables = self.tables.lock().await;
        let mut listings: Vec<ShowtimeListing> = tables
            .showtimes
            .values()
            .filter(|showtime| showtime.show_date >= from)
            .filter_map(|showtime| {
                let movie = tables.movies.get(&showtime.movie_id)?;
                let screen = tables.screens.get(&showtime.screen_id)?;
                Some(ShowtimeListing {
                    id: showtime.id,
                    movie_id: movie.id,
                    movie_title: movie.title.clone(),
                    screen_id: screen.id,
                    screen_name: screen.name.clone(),
                    show_date: showtime.show_date,
                    show_time: showtime.show_time,
                    price: showtime.price,
                })
            })
            .collect();
        listings.sort_by_key(|l| (l.show_date, l.show_time, l.id));
        Ok(listings)
    }

    async fn active_seat_ids(&self, showtime_id: i32) -> AppResult<Vec<i32>> {
        Ok(self.tables.lock().await.active_seat_ids(showtime_id))
    }

    async fn booking(&self, booking_id: i32) -> AppResult<Option<Booking>> {
        Ok(self.tables.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_user(&self, user_id: i32) -> AppResult<Vec<BookingSummary>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<&Booking> = tables
            .bookings
            .values()
            .filter(|booking| booking.user_id == user_id)
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(bookings
            .into_iter()
            .filter_map(|booking| tables.summary(booking))
            .collect())
    }

    async fn active_bookings(&self, from: NaiveDate) -> AppResult<Vec<BookingSummary>> {
        let tables = self.tables.lock().await;
        let mut summaries: Vec<BookingSummary> = tables
            .bookings
            .values()
            .filter(|booking| !booking.cancelled)
            .filter_map(|booking| tables.summary(booking))
            .filter(|summary| summary.show_date >= from)
            .collect();
        summaries.sort_by_key(|s| (s.show_date, s.show_time, s.booking_id));
        Ok(summaries)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_screen(&mut self, name: &str, total_seats: i32) -> AppResult<i32> {
        let id = self.working.next_id();
        self.working.screens.insert(
            id,
            Screen {
                id,
                name: name.to_string(),
                total_seats,
            },
        );
        Ok(id)
    }

    async fn insert_seats(&mut self, screen_id: i32, seats: &[NewSeat]) -> AppResult<()> {
        if !self.working.screens.contains_key(&screen_id) {
            return Err(AppError::NotFound(format!("Screen {} not found", screen_id)));
        }

        let mut taken: HashSet<(String, i32)> = self
            .working
            .seats
            .values()
            .filter(|seat| seat.screen_id == screen_id)
            .map(|seat| (seat.seat_row.clone(), seat.number))
            .collect();

        for seat in seats {
            if !taken.insert((seat.row.clone(), seat.number)) {
                return Err(AppError::InvalidInput(format!(
                    "screen {} already has seat {}{}",
                    screen_id, seat.row, seat.number
                )));
            }
            let id = self.working.next_id();
            self.working.seats.insert(
                id,
                Seat {
                    id,
                    screen_id,
                    seat_row: seat.row.clone(),
                    number: seat.number,
                },
            );
        }
        Ok(())
    }

    async fn screen_exists(&mut self, screen_id: i32) -> AppResult<bool> {
        Ok(self.working.screens.contains_key(&screen_id))
    }

    async fn insert_movie(&mut self, movie: &CreateMovieRequest) -> AppResult<i32> {
        let id = self.working.next_id();
        self.working.movies.insert(
            id,
            Movie {
                id,
                title: movie.title.clone(),
                duration: movie.duration,
                rating: movie.rating.clone(),
                description: movie.description.clone(),
                image_url: movie.image_url.clone(),
            },
        );
        Ok(id)
    }

    async fn movie_exists(&mut self, movie_id: i32) -> AppResult<bool> {
        Ok(self.working.movies.contains_key(&movie_id))
    }

    async fn update_movie(&mut self, movie_id: i32, movie: &CreateMovieRequest) -> AppResult<()> {
        if let Some(existing) = self.working.movies.get_mut(&movie_id) {
            existing.title = movie.title.clone();
            existing.duration = movie.duration;
            existing.rating = movie.rating.clone();
            existing.description = movie.description.clone();
            existing.image_url = movie.image_url.clone();
        }
        Ok(())
    }

    async fn delete_movie(&mut self, movie_id: i32) -> AppResult<Option<u64>> {
        if self.working.movies.remove(&movie_id).is_none() {
            return Ok(None);
        }

        let showtime_ids: Vec<i32> = self
            .working
            .showtimes
            .values()
            .filter(|showtime| showtime.movie_id == movie_id)
            .map(|showtime| showtime.id)
            .collect();
        for showtime_id in &showtime_ids {
            self.working.remove_showtime(*showtime_id);
        }
        Ok(Some(showtime_ids.len() as u64))
    }

    async fn insert_showtime(&mut self, showtime: &CreateShowtimeRequest) -> AppResult<i32> {
        let id = self.working.next_id();
        self.working.showtimes.insert(
            id,
            Showtime {
                id,
                movie_id: showtime.movie_id,
                screen_id: showtime.screen_id,
                show_date: showtime.show_date,
                show_time: showtime.show_time,
                price: showtime.price,
            },
        );
        Ok(id)
    }

    async fn update_showtime(&mut self, showtime_id: i32, showtime: &CreateShowtimeRequest) -> AppResult<()> {
        if let Some(existing) = self.working.showtimes.get_mut(&showtime_id) {
            existing.movie_id = showtime.movie_id;
            existing.screen_id = showtime.screen_id;
            existing.show_date = showtime.show_date;
            existing.show_time = showtime.show_time;
            existing.price = showtime.price;
        }
        Ok(())
    }

    async fn has_active_bookings(&mut self, showtime_id: i32) -> AppResult<bool> {
        Ok(self
            .working
            .bookings
            .values()
            .any(|booking| booking.showtime_id == showtime_id && !booking.cancelled))
    }

    async fn lock_showtime(&mut self, showtime_id: i32) -> AppResult<Option<Showtime>> {
        // The whole store is already locked
        Ok(self.working.showtimes.get(&showtime_id).cloned())
    }

    async fn seats_on_screen(&mut self, screen_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        Ok(seat_ids
            .iter()
            .copied()
            .filter(|id| {
                self.working
                    .seats
                    .get(id)
                    .map_or(false, |seat| seat.screen_id == screen_id)
            })
            .collect())
    }

    async fn conflicting_seats(&mut self, showtime_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        let active = self.working.active_seat_ids(showtime_id);
        Ok(seat_ids
            .iter()
            .copied()
            .filter(|id| active.binary_search(id).is_ok())
            .collect())
    }

    async fn insert_booking(
        &mut self,
        user_id: i32,
        showtime_id: i32,
        created_at: NaiveDateTime,
    ) -> AppResult<i32> {
        if !self.working.showtimes.contains_key(&showtime_id) {
            return Err(AppError::NotFound(format!("Showtime {} not found", showtime_id)));
        }

        let id = self.working.next_id();
        self.working.bookings.insert(
            id,
            Booking {
                id,
                user_id,
                showtime_id,
                created_at,
                cancelled: false,
            },
        );
        Ok(id)
    }

    async fn insert_booking_seats(
        &mut self,
        booking_id: i32,
        showtime_id: i32,
        seat_ids: &[i32],
    ) -> AppResult<()> {
        // Same guarantee as the UNIQUE (showtime_id, seat_id) key in MySQL
        let conflicts = self.conflicting_seats(showtime_id, seat_ids).await?;
        if !conflicts.is_empty() {
            return Err(AppError::SeatConflict(conflicts));
        }

        self.working
            .booking_seats
            .extend(seat_ids.iter().map(|&seat_id| BookingSeat {
                booking_id,
                seat_id,
                showtime_id,
            }));
        Ok(())
    }

    async fn lock_booking(&mut self, booking_id: i32) -> AppResult<Option<Booking>> {
        Ok(self.working.bookings.get(&booking_id).cloned())
    }

    async fn release_booking_seats(&mut self, booking_id: i32) -> AppResult<u64> {
        let before = self.working.booking_seats.len();
        self.working
            .booking_seats
            .retain(|bs| bs.booking_id != booking_id);
        Ok((before - self.working.booking_seats.len()) as u64)
    }

    async fn mark_cancelled(&mut self, booking_id: i32) -> AppResult<()> {
        if let Some(booking) = self.working.bookings.get_mut(&booking_id) {
            booking.cancelled = true;
        }
        Ok(())
    }

    async fn delete_showtime(&mut self, showtime_id: i32) -> AppResult<Option<u64>> {
        Ok(self.working.remove_showtime(showtime_id))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
