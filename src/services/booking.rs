//! Booking lifecycle state machine
//!
//! `pending → offered → confirmed → in_progress → completed`, with
//! `rejected` and `cancelled` as retained terminal states. Declining an
//! offer deletes the booking row; rejecting a pending request keeps it.
//!
//! Every transition runs inside one transaction and locks the booking row
//! before evaluating its guards, so two racing requests cannot both pass.
//! Guard failures roll back without touching any state; notifications and
//! payment rows are written inside the same transaction as the status
//! change.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::db::queries;
use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    Booking, BookingDetail, BookingStatus, CancelRequest, CreateBookingRequest, OfferRequest,
    PayableBooking, PaymentStatus, RespondOutcome, RespondRequest, StatusUpdateRequest,
};

/// Minimum length of a cancellation reason
const MIN_CANCEL_REASON_LEN: usize = 10;

/// Stateless service over the booking store. Constructed once at startup
/// with its dependencies; handlers call its methods per request.
#[derive(Clone)]
pub struct BookingService {
    pool: PgPool,
}

impl BookingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Client creates a booking request against an available technician.
    pub async fn create(
        &self,
        caller: Principal,
        req: CreateBookingRequest,
    ) -> ServiceResult<BookingDetail> {
        if !caller.is_client() {
            return Err(ServiceError::Forbidden(
                "only clients can create bookings".to_string(),
            ));
        }
        if req.end_date < req.start_date {
            return Err(ServiceError::Validation(
                "end date precedes start date".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // Locks the technician row: creates against the same technician
        // serialize here, so the conflict check below cannot race another
        // insert.
        let available = queries::technician::lock_availability(&mut tx, req.technician_id)
            .await?
            .ok_or(ServiceError::NotFound("technician"))?;
        if !available {
            return Err(ServiceError::Conflict(
                "technician is not available".to_string(),
            ));
        }

        let conflict = queries::booking::has_schedule_conflict(
            &mut tx,
            req.technician_id,
            req.start_date,
            req.end_date,
        )
        .await?;
        if conflict {
            return Err(ServiceError::Conflict(
                "the technician is already booked during this time slot".to_string(),
            ));
        }

        let booking = queries::booking::insert_booking(
            &mut tx,
            caller.id,
            req.technician_id,
            &req.service_type,
            &req.description,
            req.start_date,
            req.end_date,
            [
                req.client_address.as_deref(),
                req.client_city.as_deref(),
                req.client_postal_code.as_deref(),
                req.client_province.as_deref(),
                req.client_country.as_deref(),
            ],
            req.client_latitude,
            req.client_longitude,
        )
        .await?;

        queries::notification::insert(
            &mut tx,
            req.technician_id,
            &format!("New booking request for {}", req.service_type),
        )
        .await?;

        let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Technician offers a price on a pending booking.
    pub async fn offer(&self, caller: Principal, req: OfferRequest) -> ServiceResult<BookingDetail> {
        if !caller.is_technician() {
            return Err(ServiceError::Forbidden(
                "only technicians can make offers".to_string(),
            ));
        }
        if req.price < Decimal::ZERO {
            return Err(ServiceError::Validation(
                "offer price cannot be negative".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let booking = lock_owned(&mut tx, req.id, caller).await?;
        ensure_status(&booking, &[BookingStatus::Pending], "make an offer on")?;

        queries::booking::set_offer(&mut tx, booking.id, req.price).await?;
        queries::notification::insert(
            &mut tx,
            booking.client_id,
            &format!(
                "New price offer (R{}) for your {} booking",
                req.price, booking.service_type
            ),
        )
        .await?;

        let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Client accepts or declines an offer. Accepting confirms the booking;
    /// declining removes the booking row entirely.
    pub async fn respond(
        &self,
        caller: Principal,
        req: RespondRequest,
    ) -> ServiceResult<RespondOutcome> {
        if !caller.is_client() {
            return Err(ServiceError::Forbidden(
                "only clients can respond to offers".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let booking = lock_owned(&mut tx, req.id, caller).await?;
        ensure_status(&booking, &[BookingStatus::Offered], "respond to")?;

        let outcome = if req.accept {
            queries::booking::set_status(&mut tx, booking.id, BookingStatus::Confirmed.as_str())
                .await?;
            queries::notification::insert(
                &mut tx,
                booking.technician_id,
                "Client has accepted your offer",
            )
            .await?;
            let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
                .await?
                .ok_or(ServiceError::NotFound("booking"))?;
            RespondOutcome::Accepted(detail)
        } else {
            let deleted = match turndown_disposal(current_status(&booking)?) {
                None => queries::booking::delete_booking(&mut tx, booking.id).await?,
                Some(status) => {
                    queries::booking::set_status(&mut tx, booking.id, status.as_str()).await?;
                    false
                }
            };
            queries::notification::insert(
                &mut tx,
                booking.technician_id,
                "Client has rejected your offer",
            )
            .await?;
            RespondOutcome::Declined { deleted }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Technician declines a pending request. Unlike a declined offer, the
    /// row is retained with status `rejected`.
    pub async fn reject_pending(&self, caller: Principal, id: Uuid) -> ServiceResult<BookingDetail> {
        if !caller.is_technician() {
            return Err(ServiceError::Forbidden(
                "only technicians can reject bookings".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let booking = lock_owned(&mut tx, id, caller).await?;
        ensure_status(&booking, &[BookingStatus::Pending], "reject")?;

        match turndown_disposal(current_status(&booking)?) {
            Some(status) => {
                queries::booking::set_status(&mut tx, booking.id, status.as_str()).await?;
            }
            None => {
                queries::booking::delete_booking(&mut tx, booking.id).await?;
            }
        }
        queries::notification::insert(
            &mut tx,
            booking.client_id,
            &format!(
                "Your {} booking has been rejected by the technician",
                booking.service_type
            ),
        )
        .await?;

        let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Technician starts work on a confirmed booking.
    pub async fn start(&self, caller: Principal, id: Uuid) -> ServiceResult<BookingDetail> {
        if !caller.is_technician() {
            return Err(ServiceError::Forbidden(
                "only technicians can start jobs".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let booking = lock_owned(&mut tx, id, caller).await?;
        ensure_status(&booking, &[BookingStatus::Confirmed], "start")?;

        queries::booking::mark_started(&mut tx, booking.id).await?;
        queries::notification::insert(
            &mut tx,
            booking.client_id,
            &format!(
                "Work on your {} booking has started",
                booking.service_type
            ),
        )
        .await?;

        let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Technician completes an in-progress booking. When a price is set, a
    /// pending payment row is created in the same transaction; an existing
    /// effective payment is left alone.
    pub async fn complete(&self, caller: Principal, id: Uuid) -> ServiceResult<BookingDetail> {
        if !caller.is_technician() {
            return Err(ServiceError::Forbidden(
                "only technicians can complete jobs".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let booking = lock_owned(&mut tx, id, caller).await?;
        ensure_status(&booking, &[BookingStatus::InProgress], "complete")?;

        queries::booking::mark_completed(&mut tx, booking.id).await?;

        if let Some(price) = booking.price {
            let existing =
                queries::payment::lock_effective_for_booking(&mut tx, booking.id).await?;
            if existing.is_none() {
                queries::payment::insert_payment(
                    &mut tx,
                    booking.id,
                    booking.client_id,
                    booking.technician_id,
                    price,
                    None,
                    PaymentStatus::Pending.as_str(),
                )
                .await?;
            }
        }

        queries::notification::insert(
            &mut tx,
            booking.client_id,
            &format!("Your {} booking has been completed", booking.service_type),
        )
        .await?;

        let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Either participant cancels a pending or confirmed booking, with a
    /// mandatory reason; the counterparty is notified.
    pub async fn cancel(&self, caller: Principal, req: CancelRequest) -> ServiceResult<BookingDetail> {
        validate_cancel_reason(&req.reason)?;

        let mut tx = self.pool.begin().await?;

        let booking = lock_owned(&mut tx, req.id, caller).await?;
        ensure_status(
            &booking,
            &[BookingStatus::Pending, BookingStatus::Confirmed],
            "cancel",
        )?;

        queries::booking::mark_cancelled(&mut tx, booking.id, req.reason.trim()).await?;
        queries::notification::insert(
            &mut tx,
            counterparty(caller, &booking),
            &format!(
                "Your {} booking has been cancelled by the {}",
                booking.service_type,
                caller.role.as_str()
            ),
        )
        .await?;

        let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Override path: direct status and price mutation without lifecycle
    /// guards. Participant-only, and terminal bookings stay terminal.
    pub async fn update_status(
        &self,
        caller: Principal,
        req: StatusUpdateRequest,
    ) -> ServiceResult<BookingDetail> {
        let mut tx = self.pool.begin().await?;

        let booking = lock_owned(&mut tx, req.id, caller).await?;
        let current = current_status(&booking)?;
        if current.is_terminal() && req.status != current {
            return Err(ServiceError::Conflict(format!(
                "cannot move a {} booking to {}",
                current.as_str(),
                req.status.as_str()
            )));
        }

        warn!(
            booking_id = %booking.id,
            from = current.as_str(),
            to = req.status.as_str(),
            "Booking status override"
        );

        queries::booking::override_status(&mut tx, booking.id, req.status.as_str(), req.price)
            .await?;
        queries::notification::insert(
            &mut tx,
            counterparty(caller, &booking),
            &format!("Booking status updated to {}", req.status.as_str()),
        )
        .await?;

        let detail = queries::booking::get_detail_tx(&mut tx, booking.id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Fetch one booking, participant-authorized.
    pub async fn get(&self, caller: Principal, id: Uuid) -> ServiceResult<BookingDetail> {
        let detail = queries::booking::get_detail(&self.pool, id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        ensure_participant_ids(caller, detail.client_id, detail.technician_id)?;
        Ok(detail)
    }

    /// Bookings for the caller: a client sees their bookings, a technician
    /// their jobs.
    pub async fn list_for_caller(
        &self,
        caller: Principal,
        status: Option<BookingStatus>,
    ) -> ServiceResult<Vec<BookingDetail>> {
        let status = status.map(|s| s.as_str());
        match caller.role {
            Role::Client => {
                Ok(queries::booking::list_for_client(&self.pool, caller.id, status).await?)
            }
            Role::Technician => {
                Ok(queries::booking::list_for_technician(&self.pool, caller.id, status).await?)
            }
            Role::Admin => Err(ServiceError::Forbidden(
                "no booking list for this role".to_string(),
            )),
        }
    }

    /// Five most recent bookings for a client dashboard.
    pub async fn recent(&self, caller: Principal) -> ServiceResult<Vec<BookingDetail>> {
        if !caller.is_client() {
            return Err(ServiceError::Forbidden(
                "only clients can access recent bookings".to_string(),
            ));
        }
        Ok(queries::booking::recent_for_client(&self.pool, caller.id).await?)
    }

    /// Completed-but-unpaid bookings for a client.
    pub async fn payable(&self, caller: Principal) -> ServiceResult<Vec<PayableBooking>> {
        if !caller.is_client() {
            return Err(ServiceError::Forbidden(
                "only clients can access payable bookings".to_string(),
            ));
        }
        Ok(queries::booking::payable_for_client(&self.pool, caller.id).await?)
    }
}

/// Lock the booking row and verify the caller is the participant matching
/// their role. Identity comparison is on `Uuid` values; there is no
/// textual normalization anywhere.
async fn lock_owned(
    tx: &mut sqlx::PgConnection,
    id: Uuid,
    caller: Principal,
) -> ServiceResult<Booking> {
    let booking = queries::booking::lock_booking(tx, id)
        .await?
        .ok_or(ServiceError::NotFound("booking"))?;
    ensure_participant_ids(caller, booking.client_id, booking.technician_id)?;
    Ok(booking)
}

fn ensure_participant_ids(
    caller: Principal,
    client_id: Uuid,
    technician_id: Uuid,
) -> ServiceResult<()> {
    let owned = match caller.role {
        Role::Client => caller.id == client_id,
        Role::Technician => caller.id == technician_id,
        Role::Admin => true,
    };
    if owned {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("not your booking".to_string()))
    }
}

/// The participant on the other side of the booking from the caller.
fn counterparty(caller: Principal, booking: &Booking) -> Uuid {
    if caller.id == booking.technician_id {
        booking.client_id
    } else {
        booking.technician_id
    }
}

fn current_status(booking: &Booking) -> ServiceResult<BookingStatus> {
    booking.status().ok_or_else(|| {
        ServiceError::Validation(format!("unknown booking status '{}'", booking.status))
    })
}

/// Guard: the booking must currently be in one of `expected`.
fn ensure_status(
    booking: &Booking,
    expected: &[BookingStatus],
    action: &str,
) -> ServiceResult<()> {
    let current = current_status(booking)?;
    if expected.contains(&current) {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "cannot {} a booking in status {}",
            action,
            current.as_str()
        )))
    }
}

/// Disposal of a booking the counterparty turns down, keyed on the state
/// it is leaving. A declined offer is removed outright (`None`); a
/// rejected pending request is retained under the returned status.
fn turndown_disposal(from: BookingStatus) -> Option<BookingStatus> {
    match from {
        BookingStatus::Offered => None,
        _ => Some(BookingStatus::Rejected),
    }
}

fn validate_cancel_reason(reason: &str) -> ServiceResult<()> {
    if reason.trim().chars().count() < MIN_CANCEL_REASON_LEN {
        return Err(ServiceError::Validation(format!(
            "cancellation reason must be at least {} characters",
            MIN_CANCEL_REASON_LEN
        )));
    }
    Ok(())
}

/// Inclusive range intersection: `[a_start, a_end]` overlaps
/// `[b_start, b_end]` when `a_start <= b_end && a_end >= b_start`.
/// The SQL conflict check in `queries::booking` applies the same predicate.
pub fn windows_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start <= b_end && a_end >= b_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn booking_in(status: BookingStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            technician_id: Uuid::new_v4(),
            service_type: "plumbing".to_string(),
            description: "Leaking geyser".to_string(),
            status: status.as_str().to_string(),
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

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn overlap_exact_match() {
        assert!(windows_overlap(at(8), at(10), at(8), at(10)));
    }

    #[test]
    fn overlap_fully_contained() {
        assert!(windows_overlap(at(8), at(12), at(9), at(10)));
        assert!(windows_overlap(at(9), at(10), at(8), at(12)));
    }

    #[test]
    fn overlap_partial() {
        assert!(windows_overlap(at(8), at(10), at(9), at(11)));
        assert!(windows_overlap(at(9), at(11), at(8), at(10)));
    }

    #[test]
    fn overlap_boundary_touch_is_inclusive() {
        // Shared endpoint counts as a conflict
        assert!(windows_overlap(at(8), at(10), at(10), at(12)));
    }

    #[test]
    fn no_overlap_for_disjoint_windows() {
        assert!(!windows_overlap(at(8), at(9), at(10), at(12)));
        assert!(!windows_overlap(at(13), at(14), at(10), at(12)));
    }

    #[test]
    fn start_requires_confirmed() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Offered,
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
        ] {
            let err = ensure_status(&booking_in(status), &[BookingStatus::Confirmed], "start")
                .unwrap_err();
            assert_eq!(err.code(), "CONFLICT", "status {:?}", status);
        }
        assert!(ensure_status(
            &booking_in(BookingStatus::Confirmed),
            &[BookingStatus::Confirmed],
            "start"
        )
        .is_ok());
    }

    #[test]
    fn complete_requires_in_progress() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Offered,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
        ] {
            let err = ensure_status(&booking_in(status), &[BookingStatus::InProgress], "complete")
                .unwrap_err();
            assert_eq!(err.code(), "CONFLICT", "status {:?}", status);
        }
        assert!(ensure_status(
            &booking_in(BookingStatus::InProgress),
            &[BookingStatus::InProgress],
            "complete"
        )
        .is_ok());
    }

    #[test]
    fn participant_check_is_exact_uuid_match() {
        let booking = booking_in(BookingStatus::Pending);

        let owner = Principal {
            id: booking.client_id,
            role: Role::Client,
        };
        assert!(
            ensure_participant_ids(owner, booking.client_id, booking.technician_id).is_ok()
        );

        let stranger = Principal {
            id: Uuid::new_v4(),
            role: Role::Client,
        };
        let err = ensure_participant_ids(stranger, booking.client_id, booking.technician_id)
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        // A technician token carrying the client's id is still rejected
        let cross_role = Principal {
            id: booking.client_id,
            role: Role::Technician,
        };
        assert!(ensure_participant_ids(
            cross_role,
            booking.client_id,
            booking.technician_id
        )
        .is_err());
    }

    #[test]
    fn counterparty_flips_sides() {
        let booking = booking_in(BookingStatus::Confirmed);

        let as_client = Principal {
            id: booking.client_id,
            role: Role::Client,
        };
        assert_eq!(counterparty(as_client, &booking), booking.technician_id);

        let as_technician = Principal {
            id: booking.technician_id,
            role: Role::Technician,
        };
        assert_eq!(counterparty(as_technician, &booking), booking.client_id);
    }

    #[test]
    fn declined_offer_is_deleted_but_rejected_request_is_retained() {
        // The two turn-down paths must stay distinguishable: a declined
        // offer leaves no row behind, a rejected pending request stays on
        // record.
        assert_eq!(turndown_disposal(BookingStatus::Offered), None);
        assert_eq!(
            turndown_disposal(BookingStatus::Pending),
            Some(BookingStatus::Rejected)
        );
        // and the retained row lands in a terminal, queryable state
        assert!(BookingStatus::Rejected.is_terminal());
    }

    #[test]
    fn cancel_reason_minimum_length() {
        assert!(validate_cancel_reason("too short").is_err());
        assert!(validate_cancel_reason("   padded   ").is_err());
        assert!(validate_cancel_reason("client requested a different date").is_ok());
    }

    #[test]
    fn unknown_status_string_is_flagged() {
        let mut booking = booking_in(BookingStatus::Pending);
        booking.status = "accepted-ish".to_string();
        assert!(current_status(&booking).is_err());
    }
}
