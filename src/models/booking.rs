use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::screen::SeatMap;
use super::showtime::Showtime;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Booking {
    pub id: i32,
    pub user_id: i32,
    pub showtime_id: i32,
    pub created_at: NaiveDateTime,
    pub cancelled: bool,
}

impl Booking {
    pub fn status(&self) -> BookingStatus {
        if self.cancelled {
            BookingStatus::Cancelled
        } else {
            BookingStatus::Active
        }
    }
}

// A seat held by a booking. showtime_id is denormalised from the booking so the
// store can keep (showtime_id, seat_id) unique across active bookings.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookingSeat {
    pub booking_id: i32,
    pub seat_id: i32,
    pub showtime_id: i32,
}

// Active is the only non-terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
pub enum BookingStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BookingRequest {
    pub showtime_id: i32,
    pub seat_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BookingResponse {
    pub booking_id: i32,
    pub showtime_id: i32,
    pub seat_ids: Vec<i32>,
    pub booking_status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct CancelResponse {
    pub booking_id: i32,
    pub released_seats: u64,
    pub already_cancelled: bool,
    pub booking_status: BookingStatus,
}

// A seat as shown on the selection screen
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SelectableSeat {
    pub id: i32,
    pub number: i32,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SelectableRow {
    pub label: String,
    pub seats: Vec<SelectableSeat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SeatSelectionResponse {
    pub showtime: Showtime,
    pub rows: Vec<SelectableRow>,
    pub active_seat_ids: Vec<i32>,
}

impl SeatSelectionResponse {
    pub fn new(showtime: Showtime, seat_map: SeatMap, active_seat_ids: Vec<i32>) -> Self {
        let rows = seat_map
            .rows
            .into_iter()
            .map(|row| SelectableRow {
                label: row.label,
                seats: row
                    .seats
                    .into_iter()
                    .map(|seat| SelectableSeat {
                        available: !active_seat_ids.contains(&seat.id),
                        id: seat.id,
                        number: seat.number,
                    })
                    .collect(),
            })
            .collect();

        SeatSelectionResponse {
            showtime,
            rows,
            active_seat_ids,
        }
    }

    pub fn selectable_seat_ids(&self) -> Vec<i32> {
        self.rows
            .iter()
            .flat_map(|row| row.seats.iter())
            .filter(|seat| seat.available)
            .map(|seat| seat.id)
            .collect()
    }
}

// One line of a user's booking history or the admin booking list
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BookingSummary {
    pub booking_id: i32,
    pub user_id: i32,
    pub showtime_id: i32,
    pub movie_title: String,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub booked_at: NaiveDateTime,
    pub seats: Vec<String>,
    pub booking_status: BookingStatus,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BookingHistoryResponse {
    pub bookings: Vec<BookingSummary>,
}
