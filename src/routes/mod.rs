pub mod booking_route;
pub mod screen_route;
pub mod showtime_route;

use chrono::{NaiveDate, Utc};

use crate::utils::error::{AppError, AppResult};

// `?from=YYYY-MM-DD` query parameter, today when absent
fn from_date(from: Option<String>) -> AppResult<NaiveDate> {
    match from {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| AppError::InvalidInput("Invalid from date format".into())),
        None => Ok(Utc::now().date_naive()),
    }
}
