use crate::utils::error::AppError;
use rocket_okapi::okapi::openapi3::{Response, Responses, MediaType};
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::RefOr;
use okapi::openapi3::SchemaObject;
use indexmap::IndexMap;
use serde_json::json;

impl<'r> OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();

        // Define error responses
        let error_responses = [
            ("Bad Request", AppError::InvalidInput("seat_ids must not be empty".to_string())),
            ("Unauthorized", AppError::AuthError("Missing bearer token".to_string())),
            ("Forbidden", AppError::Forbidden("Booking belongs to another user".to_string())),
            ("Not Found", AppError::NotFound("Showtime not found".to_string())),
            ("Conflict", AppError::SeatConflict(vec![2])),
            ("Internal Server Error", AppError::CancellationFailed("Cancellation rolled back".to_string())),
            ("Service Unavailable", AppError::TransactionFailure("Store unavailable".to_string())),
        ];

        for (description, error) in error_responses {
            let mut example = json!({
                "error": error.to_string(),
                "retryable": error.is_retryable()
            });
            if let AppError::SeatConflict(seat_ids) = &error {
                example["conflicting_seat_ids"] = json!(seat_ids);
            }

            responses.responses.insert(
                error.status().code.to_string(),
                RefOr::Object(Response {
                    description: description.to_string(),
                    content: {
                        let mut content = IndexMap::new();
                        content.insert(
                            "application/json".to_string(),
                            MediaType {
                                schema: Some(SchemaObject::default()),
                                example: Some(example),
                                ..Default::default()
                            },
                        );
                        content
                    },
                    ..Default::default()
                }),
            );
        }

        Ok(responses)
    }
}
