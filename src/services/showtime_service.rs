use std::sync::Arc;

use chrono::NaiveDate;

use validator::Validate;

use crate::models::booking::SeatSelectionResponse;
use crate::models::showtime::{
    CreateMovieRequest, CreateShowtimeRequest, Movie, Showtime, ShowtimeListing,
};
use crate::services::screen_service::ScreenService;
use crate::store::BookingStore;
use crate::utils::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ShowtimeService {
    store: Arc<dyn BookingStore>,
    screen_service: ScreenService,
}

impl ShowtimeService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        ShowtimeService {
            screen_service: ScreenService::new(store.clone()),
            store,
        }
    }

    pub async fn create_movie(&self, request: CreateMovieRequest) -> AppResult<i32> {
        request.validate()?;

        let mut tx = self.store.begin().await?;
        let movie_id = tx.insert_movie(&request).await?;
        tx.commit().await?;

        tracing::info!(movie_id, title = %request.title, "movie created");
        Ok(movie_id)
    }

    pub async fn get_movie(&self, movie_id: i32) -> AppResult<Movie> {
        self.store
            .movie(movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movie not found".into()))
    }

    pub async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        self.store.list_movies().await
    }

    pub async fn update_movie(&self, movie_id: i32, request: CreateMovieRequest) -> AppResult<Movie> {
        request.validate()?;

        let mut tx = self.store.begin().await?;
        if !tx.movie_exists(movie_id).await? {
            return Err(AppError::NotFound("Movie not found".into()));
        }
        tx.update_movie(movie_id, &request).await?;
        tx.commit().await?;

        tracing::info!(movie_id, "movie updated");
        Ok(Movie {
            id: movie_id,
            title: request.title,
            duration: request.duration,
            rating: request.rating,
            description: request.description,
            image_url: request.image_url,
        })
    }

    // Remove a movie together with its showtimes and their bookings
    pub async fn delete_movie(&self, movie_id: i32) -> AppResult<u64> {
        let mut tx = self.store.begin().await?;
        let removed = tx
            .delete_movie(movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movie not found".into()))?;
        tx.commit().await?;

        tracing::info!(movie_id, showtimes_removed = removed, "movie deleted");
        Ok(removed)
    }

    pub async fn create_showtime(&self, request: CreateShowtimeRequest) -> AppResult<i32> {
        validate_showtime(&request)?;

        let mut tx = self.store.begin().await?;
        if !tx.movie_exists(request.movie_id).await? {
            return Err(AppError::NotFound("Movie not found".into()));
        }
        if !tx.screen_exists(request.screen_id).await? {
            return Err(AppError::NotFound("Screen not found".into()));
        }
        let showtime_id = tx.insert_showtime(&request).await?;
        tx.commit().await?;

        tracing::info!(showtime_id, screen_id = request.screen_id, "showtime created");
        Ok(showtime_id)
    }

    /// Edit a showtime. Moving it to another screen is refused while it has
    /// active bookings, since their seats belong to the old screen.
    pub async fn update_showtime(&self, showtime_id: i32, request: CreateShowtimeRequest) -> AppResult<Showtime> {
        validate_showtime(&request)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_showtime(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".into()))?;
        if !tx.movie_exists(request.movie_id).await? {
            return Err(AppError::NotFound("Movie not found".into()));
        }
        if !tx.screen_exists(request.screen_id).await? {
            return Err(AppError::NotFound("Screen not found".into()));
        }
        if current.screen_id != request.screen_id && tx.has_active_bookings(showtime_id).await? {
            return Err(AppError::InvalidInput(
                "cannot move a showtime with active bookings to another screen".into(),
            ));
        }
        tx.update_showtime(showtime_id, &request).await?;
        tx.commit().await?;

        tracing::info!(showtime_id, screen_id = request.screen_id, "showtime updated");
        Ok(Showtime {
            id: showtime_id,
            movie_id: request.movie_id,
            screen_id: request.screen_id,
            show_date: request.show_date,
            show_time: request.show_time,
            price: request.price,
        })
    }

    // Showtimes on or after `from`, for browsing
    pub async fn upcoming_showtimes(&self, from: NaiveDate) -> AppResult<Vec<ShowtimeListing>> {
        self.store.upcoming_showtimes(from).await
    }

    pub async fn get_showtime(&self, showtime_id: i32) -> AppResult<Showtime> {
        self.store
            .showtime(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".into()))
    }

    // Remove a showtime together with its bookings
    pub async fn delete_showtime(&self, showtime_id: i32) -> AppResult<u64> {
        let mut tx = self.store.begin().await?;
        let removed = tx
            .delete_showtime(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".into()))?;
        tx.commit().await?;

        tracing::info!(showtime_id, bookings_removed = removed, "showtime deleted");
        Ok(removed)
    }

    /// Seats held by non-cancelled bookings for the showtime, ascending.
    pub async fn active_seat_ids(&self, showtime_id: i32) -> AppResult<Vec<i32>> {
        self.store.active_seat_ids(showtime_id).await
    }

    // Seat map of the showtime's screen with the currently booked seats marked
    pub async fn seat_selection(&self, showtime_id: i32) -> AppResult<SeatSelectionResponse> {
        let showtime = self.get_showtime(showtime_id).await?;
        let seat_map = self.screen_service.build_seat_map(showtime.screen_id).await?;
        let active = self.active_seat_ids(showtime_id).await?;

        Ok(SeatSelectionResponse::new(showtime, seat_map, active))
    }
}

fn validate_showtime(request: &CreateShowtimeRequest) -> AppResult<()> {
    request.validate()?;
    if request.price.is_sign_negative() {
        return Err(AppError::InvalidInput("price must not be negative".into()));
    }
    Ok(())
}
