use std::sync::Arc;

use indexmap::IndexMap;
use validator::Validate;

use crate::models::screen::{
    row_label, seat_order, CreateScreenRequest, CreateScreenResponse, NewSeat, Seat, SeatMap,
    SeatRow, MAX_SEATS_PER_SCREEN,
};
use crate::store::BookingStore;
use crate::utils::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ScreenService {
    store: Arc<dyn BookingStore>,
}

impl ScreenService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        ScreenService { store }
    }

    // Create a screen and its whole seat inventory in one transaction
    pub async fn create_screen(&self, request: CreateScreenRequest) -> AppResult<CreateScreenResponse> {
        request.validate()?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("screen name must not be empty".into()));
        }

        let seats = plan_seats(request.total_seats, request.seats_per_row)?;
        let rows = row_count(request.total_seats, request.seats_per_row);

        let mut tx = self.store.begin().await?;
        let screen_id = tx.insert_screen(name, request.total_seats).await?;
        tx.insert_seats(screen_id, &seats).await?;
        tx.commit().await?;

        tracing::info!(screen_id, rows, seats = seats.len(), "screen created");

        Ok(CreateScreenResponse {
            screen_id,
            rows,
            seats: seats.len(),
        })
    }

    pub async fn build_seat_map(&self, screen_id: i32) -> AppResult<SeatMap> {
        if self.store.screen(screen_id).await?.is_none() {
            return Err(AppError::NotFound("Screen not found".into()));
        }

        let seats = self.store.seats_for_screen(screen_id).await?;
        Ok(group_seats(screen_id, seats))
    }
}

// Both arguments must already be positive
fn row_count(total_seats: i32, seats_per_row: i32) -> usize {
    ((total_seats - 1) / seats_per_row + 1) as usize
}

/// Lay out `total_seats` in rows of `seats_per_row`. Rows are labelled A, B, ...,
/// Z, AA, AB, ... and every row is full except possibly the last one, which
/// holds the remainder.
pub fn plan_seats(total_seats: i32, seats_per_row: i32) -> AppResult<Vec<NewSeat>> {
    if total_seats <= 0 {
        return Err(AppError::InvalidInput("total_seats must be positive".into()));
    }
    if total_seats > MAX_SEATS_PER_SCREEN {
        return Err(AppError::InvalidInput(format!(
            "total_seats must be at most {}",
            MAX_SEATS_PER_SCREEN
        )));
    }
    if seats_per_row <= 0 {
        return Err(AppError::InvalidInput("seats_per_row must be positive".into()));
    }

    let rows = row_count(total_seats, seats_per_row);
    let mut seats = Vec::with_capacity(total_seats as usize);
    let mut remaining = total_seats;

    for r in 0..rows {
        let label = row_label(r as u32);
        let in_row = remaining.min(seats_per_row);
        seats.extend((1..=in_row).map(|number| NewSeat {
            row: label.clone(),
            number,
        }));
        remaining -= in_row;
    }

    Ok(seats)
}

/// Group a screen's seats into rows in creation order, seats by number.
pub fn group_seats(screen_id: i32, mut seats: Vec<Seat>) -> SeatMap {
    seats.sort_by_key(|seat| seat_order(&seat.seat_row, seat.number));

    let mut rows: IndexMap<String, Vec<Seat>> = IndexMap::new();
    for seat in seats {
        rows.entry(seat.seat_row.clone()).or_default().push(seat);
    }

    SeatMap {
        screen_id,
        rows: rows
            .into_iter()
            .map(|(label, seats)| SeatRow { label, seats })
            .collect(),
    }
}
