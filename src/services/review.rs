//! Reviews of completed bookings
//!
//! Clients review their completed bookings, once per booking. Creation
//! locks the booking row first, same as the payment path, so the
//! duplicate check and the insert are serialized.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::queries;
use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    Booking, BookingStatus, CreateReviewRequest, ReviewDetail, TechnicianReviewsResponse,
};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 50;

#[derive(Clone)]
pub struct ReviewService {
    pool: PgPool,
}

impl ReviewService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Client reviews one of their completed bookings. The technician is
    /// notified in the same transaction.
    pub async fn create(
        &self,
        caller: Principal,
        req: CreateReviewRequest,
    ) -> ServiceResult<ReviewDetail> {
        if !caller.is_client() {
            return Err(ServiceError::Forbidden(
                "only clients can write reviews".to_string(),
            ));
        }
        validate_rating(req.rating)?;

        let mut tx = self.pool.begin().await?;

        let booking = queries::booking::lock_booking(&mut tx, req.booking_id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        ensure_reviewable(&booking, caller)?;

        if queries::review::exists_for_booking(&mut tx, booking.id, caller.id).await? {
            return Err(ServiceError::Conflict(
                "you have already reviewed this booking".to_string(),
            ));
        }

        let id = queries::review::insert_review(
            &mut tx,
            booking.id,
            caller.id,
            booking.technician_id,
            req.rating,
            req.comment.as_deref(),
        )
        .await?;

        queries::notification::insert(
            &mut tx,
            booking.technician_id,
            &format!("New review received (rating: {})", req.rating),
        )
        .await?;

        let detail = queries::review::get_detail_tx(&mut tx, id)
            .await?
            .ok_or(ServiceError::NotFound("review"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Public review page for a technician, newest first, with the
    /// aggregate computed over all their reviews.
    pub async fn for_technician(
        &self,
        technician_id: Uuid,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> ServiceResult<TechnicianReviewsResponse> {
        let (limit, offset) = page_window(page, per_page);
        let (total_reviews, average) =
            queries::review::stats_for_technician(&self.pool, technician_id).await?;
        let reviews =
            queries::review::list_for_technician(&self.pool, technician_id, limit, offset).await?;

        Ok(TechnicianReviewsResponse {
            average_rating: round_rating(average.unwrap_or(0.0)),
            total_reviews,
            reviews,
        })
    }

    /// The calling technician's own review page.
    pub async fn mine(
        &self,
        caller: Principal,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> ServiceResult<TechnicianReviewsResponse> {
        if !caller.is_technician() {
            return Err(ServiceError::Forbidden(
                "only technicians can access their reviews".to_string(),
            ));
        }
        self.for_technician(caller.id, page, per_page).await
    }
}

fn validate_rating(rating: i32) -> ServiceResult<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ServiceError::Validation(
            "rating must be between 1 and 5".to_string(),
        ))
    }
}

/// Only the booking's client may review it, and only once the work is done.
fn ensure_reviewable(booking: &Booking, caller: Principal) -> ServiceResult<()> {
    if booking.client_id != caller.id {
        return Err(ServiceError::Forbidden("not your booking".to_string()));
    }
    if booking.status() != Some(BookingStatus::Completed) {
        return Err(ServiceError::Conflict(
            "booking must be completed before reviewing".to_string(),
        ));
    }
    Ok(())
}

/// 1-based page number to LIMIT/OFFSET, page size clamped to 1..=50
fn page_window(page: Option<u32>, per_page: Option<u32>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (i64::from(per_page), i64::from(page - 1) * i64::from(per_page))
}

fn round_rating(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Utc;

    fn completed_booking() -> Booking {
        Booking {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            technician_id: Uuid::new_v4(),
            service_type: "electrical".to_string(),
            description: "Rewire the garage".to_string(),
            status: BookingStatus::Completed.as_str().to_string(),
            price: None,
            start_date: None,
            end_date: None,
            client_address: None,
            client_city: None,
            client_postal_code: None,
            client_province: None,
            client_country: None,
            client_latitude: None,
            client_longitude: None,
            cancelled: false,
            cancellation_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(-3).is_err());
        for rating in 1..=5 {
            assert!(validate_rating(rating).is_ok());
        }
    }

    #[test]
    fn only_the_booking_client_may_review() {
        let booking = completed_booking();

        let owner = Principal {
            id: booking.client_id,
            role: Role::Client,
        };
        assert!(ensure_reviewable(&booking, owner).is_ok());

        let stranger = Principal {
            id: Uuid::new_v4(),
            role: Role::Client,
        };
        let err = ensure_reviewable(&booking, stranger).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn unfinished_bookings_cannot_be_reviewed() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Offered,
            BookingStatus::Confirmed,
            BookingStatus::InProgress,
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
        ] {
            let mut booking = completed_booking();
            booking.status = status.as_str().to_string();
            let owner = Principal {
                id: booking.client_id,
                role: Role::Client,
            };
            let err = ensure_reviewable(&booking, owner).unwrap_err();
            assert_eq!(err.code(), "CONFLICT", "status {:?}", status);
        }
    }

    #[test]
    fn page_window_defaults_and_clamps() {
        assert_eq!(page_window(None, None), (10, 0));
        assert_eq!(page_window(Some(3), Some(10)), (10, 20));
        assert_eq!(page_window(Some(0), Some(10)), (10, 0));
        assert_eq!(page_window(Some(1), Some(500)), (50, 0));
        assert_eq!(page_window(Some(2), Some(0)), (1, 1));
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        assert_eq!(round_rating(4.666_666), 4.67);
        assert_eq!(round_rating(0.0), 0.0);
    }
}
