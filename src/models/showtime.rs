use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub duration: Option<i32>,
    pub rating: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Showtime {
    pub id: i32,
    pub movie_id: i32,
    pub screen_id: i32,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub price: Decimal,
}

// A showtime as listed for browsing, with the movie and screen names resolved
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct ShowtimeListing {
    pub id: i32,
    pub movie_id: i32,
    pub movie_title: String,
    pub screen_id: i32,
    pub screen_name: String,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub price: Decimal,
}

// Used for both creating and editing a movie
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct CreateMovieRequest {
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub title: String,
    #[validate(range(min = 1, message = "duration must be positive"))]
    pub duration: Option<i32>,
    pub rating: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

// Used for both scheduling and editing a showtime
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct CreateShowtimeRequest {
    #[validate(range(min = 1, message = "movie_id must be positive"))]
    pub movie_id: i32,
    #[validate(range(min = 1, message = "screen_id must be positive"))]
    pub screen_id: i32,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub price: Decimal,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CreatedResponse {
    pub id: i32,
}
