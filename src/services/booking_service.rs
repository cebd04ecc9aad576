use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::models::booking::{BookingResponse, BookingStatus, BookingSummary, CancelResponse};
use crate::store::BookingStore;
use crate::utils::error::{AppError, AppResult};

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        BookingService { store }
    }

    /// Which of the requested seats are already held by an active booking.
    /// Advisory only: `create_booking` repeats the check inside its transaction.
    pub async fn check_conflicts(&self, showtime_id: i32, seat_ids: &[i32]) -> AppResult<Vec<i32>> {
        let requested = normalize_seat_ids(seat_ids)?;
        let active: BTreeSet<i32> = self
            .store
            .active_seat_ids(showtime_id)
            .await?
            .into_iter()
            .collect();

        Ok(requested
            .into_iter()
            .filter(|seat_id| active.contains(seat_id))
            .collect())
    }

    pub async fn create_booking(
        &self,
        user_id: i32,
        showtime_id: i32,
        seat_ids: &[i32],
    ) -> AppResult<BookingResponse> {
        let seat_ids = normalize_seat_ids(seat_ids)?;

        let mut tx = self.store.begin().await?;

        // Serialises booking writers for this showtime until commit
        let showtime = tx
            .lock_showtime(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".into()))?;

        let on_screen = tx.seats_on_screen(showtime.screen_id, &seat_ids).await?;
        if on_screen.len() != seat_ids.len() {
            let foreign: Vec<i32> = seat_ids
                .iter()
                .copied()
                .filter(|id| !on_screen.contains(id))
                .collect();
            return Err(AppError::InvalidInput(format!(
                "seats {:?} are not part of this showtime's screen",
                foreign
            )));
        }

        let conflicts = tx.conflicting_seats(showtime_id, &seat_ids).await?;
        if !conflicts.is_empty() {
            if let Err(err) = tx.rollback().await {
                tracing::warn!(showtime_id, error = %err, "rollback after seat conflict failed");
            }
            tracing::warn!(user_id, showtime_id, ?conflicts, "seat conflict");
            return Err(AppError::SeatConflict(conflicts));
        }

        let booking_id = tx
            .insert_booking(user_id, showtime_id, Utc::now().naive_utc())
            .await?;
        tx.insert_booking_seats(booking_id, showtime_id, &seat_ids).await?;
        tx.commit().await?;

        tracing::info!(booking_id, user_id, showtime_id, seats = seat_ids.len(), "booking created");

        Ok(BookingResponse {
            booking_id,
            showtime_id,
            seat_ids,
            booking_status: BookingStatus::Active,
        })
    }

    // Customer cancellation: only the owner may cancel
    pub async fn cancel_booking(&self, requester_user_id: i32, booking_id: i32) -> AppResult<CancelResponse> {
        self.cancel(booking_id, Some(requester_user_id)).await
    }

    // Admin cancellation: same as cancel_booking without the ownership check
    pub async fn admin_cancel_booking(&self, booking_id: i32) -> AppResult<CancelResponse> {
        self.cancel(booking_id, None).await
    }

    async fn cancel(&self, booking_id: i32, owner: Option<i32>) -> AppResult<CancelResponse> {
        if booking_id <= 0 {
            return Err(AppError::InvalidInput("booking_id must be positive".into()));
        }

        self.cancel_in_tx(booking_id, owner)
            .await
            .map_err(|err| match err {
                AppError::TransactionFailure(msg) => {
                    tracing::error!(booking_id, "cancellation rolled back");
                    AppError::CancellationFailed(msg)
                }
                other => other,
            })
    }

    async fn cancel_in_tx(&self, booking_id: i32, owner: Option<i32>) -> AppResult<CancelResponse> {
        let mut tx = self.store.begin().await?;

        let booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

        if let Some(requester) = owner {
            if booking.user_id != requester {
                return Err(AppError::Forbidden("Booking belongs to another user".into()));
            }
        }

        if booking.cancelled {
            if let Err(err) = tx.rollback().await {
                tracing::warn!(booking_id, error = %err, "rollback of repeated cancellation failed");
            }
            return Ok(CancelResponse {
                booking_id,
                released_seats: 0,
                already_cancelled: true,
                booking_status: BookingStatus::Cancelled,
            });
        }

        let released_seats = tx.release_booking_seats(booking_id).await?;
        tx.mark_cancelled(booking_id).await?;
        tx.commit().await?;

        tracing::info!(booking_id, released_seats, admin = owner.is_none(), "booking cancelled");

        Ok(CancelResponse {
            booking_id,
            released_seats,
            already_cancelled: false,
            booking_status: BookingStatus::Cancelled,
        })
    }

    pub async fn bookings_for_user(&self, user_id: i32) -> AppResult<Vec<BookingSummary>> {
        self.store.bookings_for_user(user_id).await
    }

    // Non-cancelled bookings for shows on or after `from`
    pub async fn active_bookings(&self, from: NaiveDate) -> AppResult<Vec<BookingSummary>> {
        self.store.active_bookings(from).await
    }
}

/// Reject empty or non-positive ids; return the distinct ids in ascending order.
pub fn normalize_seat_ids(seat_ids: &[i32]) -> AppResult<Vec<i32>> {
    if seat_ids.is_empty() {
        return Err(AppError::InvalidInput("select at least one seat".into()));
    }
    if let Some(bad) = seat_ids.iter().find(|id| **id <= 0) {
        return Err(AppError::InvalidInput(format!("invalid seat id {}", bad)));
    }

    Ok(seat_ids
        .iter()
        .copied()
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_ids_are_deduplicated_and_sorted() {
        assert_eq!(normalize_seat_ids(&[5, 2, 5, 3]).unwrap(), vec![2, 3, 5]);
    }

    #[test]
    fn empty_or_non_positive_seat_ids_are_invalid() {
        assert!(matches!(normalize_seat_ids(&[]), Err(AppError::InvalidInput(_))));
        assert!(matches!(normalize_seat_ids(&[1, 0]), Err(AppError::InvalidInput(_))));
        assert!(matches!(normalize_seat_ids(&[-4]), Err(AppError::InvalidInput(_))));
    }
}
