use thiserror::Error;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;
use rocket::Response;
use rocket::http::ContentType;
use std::io::Cursor;
use serde_json::json;
use serde::Serialize;
use rocket_okapi::JsonSchema;

#[derive(Error, Debug, Serialize, JsonSchema, PartialEq)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Seats already booked: {0:?}")]
    SeatConflict(Vec<i32>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    #[error("Cancellation failed: {0}")]
    CancellationFailed(String),

    #[error("Authentication error: {0}")]
    AuthError(String),
}

impl AppError {
    pub fn status(&self) -> Status {
        match self {
            AppError::InvalidInput(_) => Status::BadRequest,
            AppError::SeatConflict(_) => Status::Conflict,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Forbidden(_) => Status::Forbidden,
            AppError::TransactionFailure(_) => Status::ServiceUnavailable,
            AppError::CancellationFailed(_) => Status::InternalServerError,
            AppError::AuthError(_) => Status::Unauthorized,
        }
    }

    // Seat conflicts and store failures can be retried by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::SeatConflict(_) | AppError::TransactionFailure(_)
        )
    }
}

// Convert sqlx::Error to AppError::TransactionFailure
// The driver message stays in the log, the caller only learns that the store failed
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "storage error");
        AppError::TransactionFailure("the booking store is unavailable, please retry".into())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(errors.to_string())
    }
}

// Define a type alias for the result type
pub type AppResult<T> = Result<T, AppError>;

// Format all errors from the service level to a Http Response at route level
#[rocket::async_trait]
impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();

        let json = match &self {
            AppError::SeatConflict(seat_ids) => json!({
                "error": self.to_string(),
                "conflicting_seat_ids": seat_ids,
                "retryable": true
            }),
            _ => json!({
                "error": self.to_string(),
                "retryable": self.is_retryable()
            }),
        };

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(None, Cursor::new(json.to_string()))
            .ok()
    }
}
