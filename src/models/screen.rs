use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Screen {
    pub id: i32,
    pub name: String,
    pub total_seats: i32,
}

// A physical seat. Never changes once the screen is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Seat {
    pub id: i32,
    pub screen_id: i32,
    #[serde(rename = "row")]
    pub seat_row: String,
    pub number: i32,
}

impl Seat {
    // "A1", "AB12"
    pub fn label(&self) -> String {
        format!("{}{}", self.seat_row, self.number)
    }
}

/// Bijective base-26 row label: 0 -> "A", 25 -> "Z", 26 -> "AA", 27 -> "AB".
pub fn row_label(index: u32) -> String {
    let mut label = Vec::new();
    let mut n = index as u64 + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        label.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Inverse of [`row_label`]. `None` for anything that is not upper-case A-Z.
pub fn row_index(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for byte in label.bytes() {
        if !byte.is_ascii_uppercase() {
            return None;
        }
        n = n.checked_mul(26)?.checked_add(u64::from(byte - b'A') + 1)?;
    }
    u32::try_from(n - 1).ok()
}

// Sort key giving row creation order, then seat number. Unparseable rows sort last.
pub fn seat_order(row: &str, number: i32) -> (u32, String, i32) {
    (row_index(row).unwrap_or(u32::MAX), row.to_string(), number)
}

// Seat position produced by the inventory generator, before it has an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeat {
    pub row: String,
    pub number: i32,
}

// Largest hall the inventory generator accepts
pub const MAX_SEATS_PER_SCREEN: i32 = 5000;

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct CreateScreenRequest {
    #[validate(length(min = 1, max = 255, message = "screen name must not be empty"))]
    pub name: String,
    #[validate(range(min = 1, max = 5000, message = "total_seats must be between 1 and 5000"))]
    pub total_seats: i32,
    #[validate(range(min = 1, max = 500, message = "seats_per_row must be between 1 and 500"))]
    pub seats_per_row: i32,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateScreenResponse {
    pub screen_id: i32,
    pub rows: usize,
    pub seats: usize,
}

// One row of the seat map, seats ordered by number
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SeatRow {
    pub label: String,
    pub seats: Vec<Seat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SeatMap {
    pub screen_id: i32,
    pub rows: Vec<SeatRow>,
}

impl SeatMap {
    pub fn row(&self, label: &str) -> Option<&SeatRow> {
        self.rows.iter().find(|row| row.label == label)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.rows.iter().flat_map(|row| row.seats.iter())
    }

    pub fn seat_count(&self) -> usize {
        self.rows.iter().map(|row| row.seats.len()).sum()
    }

    // Look up a seat by its label, e.g. "B4"
    pub fn find(&self, label: &str) -> Option<&Seat> {
        self.seats().find(|seat| seat.label() == label)
    }
}
