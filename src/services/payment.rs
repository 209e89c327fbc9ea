//! Payment recording
//!
//! A booking carries at most one effective payment (any status except
//! `failed`). Completing a priced booking seeds a pending payment; the
//! client then settles it here. Paying a completed booking that never got
//! a payment row inserts one directly as completed.

use sqlx::PgPool;

use crate::auth::{Principal, Role};
use crate::db::queries;
use crate::error::{ServiceError, ServiceResult};
use crate::types::{BookingStatus, CreatePaymentRequest, Payment, PaymentStatus};

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Client settles a completed booking. Locks the booking row first so
    /// a concurrent attempt cannot produce two effective payments.
    pub async fn record_payment(
        &self,
        caller: Principal,
        req: CreatePaymentRequest,
    ) -> ServiceResult<Payment> {
        if !caller.is_client() {
            return Err(ServiceError::Forbidden(
                "only clients can make payments".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let booking = queries::booking::lock_booking(&mut tx, req.booking_id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))?;
        if booking.client_id != caller.id {
            return Err(ServiceError::Forbidden("not your booking".to_string()));
        }
        if booking.status() != Some(BookingStatus::Completed) {
            return Err(ServiceError::Conflict(
                "can only pay for completed bookings".to_string(),
            ));
        }
        let amount = booking.price.ok_or_else(|| {
            ServiceError::Conflict("booking has no agreed price".to_string())
        })?;

        let existing = queries::payment::lock_effective_for_booking(&mut tx, booking.id).await?;
        let payment = match settlement_for(existing.as_ref()) {
            Settlement::AlreadyPaid => {
                return Err(ServiceError::Conflict(
                    "booking has already been paid".to_string(),
                ));
            }
            Settlement::Complete(id) => queries::payment::mark_completed(&mut tx, id).await?,
            Settlement::Insert => {
                queries::payment::insert_payment(
                    &mut tx,
                    booking.id,
                    booking.client_id,
                    booking.technician_id,
                    amount,
                    req.payment_method.as_deref(),
                    PaymentStatus::Completed.as_str(),
                )
                .await?
            }
        };

        queries::notification::insert(
            &mut tx,
            booking.technician_id,
            &format!(
                "Payment of R{} received for your {} booking",
                payment.amount, booking.service_type
            ),
        )
        .await?;
        queries::notification::insert(
            &mut tx,
            booking.client_id,
            &format!(
                "Your payment of R{} for the {} booking was processed",
                payment.amount, booking.service_type
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(payment)
    }

    /// Fetch one payment, participant-authorized.
    pub async fn get(&self, caller: Principal, id: uuid::Uuid) -> ServiceResult<Payment> {
        let payment = queries::payment::get_payment(&self.pool, id)
            .await?
            .ok_or(ServiceError::NotFound("payment"))?;
        ensure_payment_party(caller, &payment)?;
        Ok(payment)
    }

    /// Payments where the caller is either side, newest first.
    pub async fn list(
        &self,
        caller: Principal,
        status: Option<PaymentStatus>,
    ) -> ServiceResult<Vec<Payment>> {
        let status = status.map(|s| s.as_str());
        Ok(queries::payment::list_for_participant(&self.pool, caller.id, status).await?)
    }
}

/// What settling a booking does to its effective payment row, if any.
/// At most one effective row ever exists, so the outcome is either a
/// refusal, an in-place completion, or a fresh insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    AlreadyPaid,
    Complete(uuid::Uuid),
    Insert,
}

fn settlement_for(existing: Option<&Payment>) -> Settlement {
    match existing {
        Some(p) if p.status == PaymentStatus::Completed.as_str() => Settlement::AlreadyPaid,
        Some(p) => Settlement::Complete(p.id),
        None => Settlement::Insert,
    }
}

fn ensure_payment_party(caller: Principal, payment: &Payment) -> ServiceResult<()> {
    let owned = match caller.role {
        Role::Client => caller.id == payment.client_id,
        Role::Technician => caller.id == payment.technician_id,
        Role::Admin => true,
    };
    if owned {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("not your payment".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn payment() -> Payment {
        Payment {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            technician_id: Uuid::new_v4(),
            amount: Decimal::new(45000, 2),
            payment_method: Some("card".to_string()),
            status: "completed".to_string(),
            transaction_date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn participants_can_view_their_payment() {
        let p = payment();

        let client = Principal {
            id: p.client_id,
            role: Role::Client,
        };
        let technician = Principal {
            id: p.technician_id,
            role: Role::Technician,
        };
        assert!(ensure_payment_party(client, &p).is_ok());
        assert!(ensure_payment_party(technician, &p).is_ok());
    }

    #[test]
    fn strangers_cannot_view_a_payment() {
        let p = payment();
        let stranger = Principal {
            id: Uuid::new_v4(),
            role: Role::Client,
        };
        let err = ensure_payment_party(stranger, &p).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn one_effective_payment_per_booking() {
        // No effective row yet: insert one, already completed
        assert_eq!(settlement_for(None), Settlement::Insert);

        // A pending row (seeded when the booking completed) is settled in
        // place, never duplicated
        let mut existing = payment();
        existing.status = "pending".to_string();
        assert_eq!(settlement_for(Some(&existing)), Settlement::Complete(existing.id));

        // A completed row means the booking was already paid
        existing.status = "completed".to_string();
        assert_eq!(settlement_for(Some(&existing)), Settlement::AlreadyPaid);

        // Any other surviving effective row is also settled in place
        existing.status = "refunded".to_string();
        assert_eq!(settlement_for(Some(&existing)), Settlement::Complete(existing.id));
    }

    #[test]
    fn role_determines_which_side_is_checked() {
        let p = payment();
        // A technician token with the client's id does not pass
        let crossed = Principal {
            id: p.client_id,
            role: Role::Technician,
        };
        assert!(ensure_payment_party(crossed, &p).is_err());
    }
}
