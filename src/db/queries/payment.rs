//! Payment database queries

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::types::Payment;

const PAYMENT_COLUMNS: &str = r#"
    id, booking_id, client_id, technician_id, amount, payment_method,
    status, transaction_date, created_at
"#;

/// The effective (non-failed) payment for a booking, locked for the
/// duration of the surrounding transaction.
pub async fn lock_effective_for_booking(
    conn: &mut PgConnection,
    booking_id: Uuid,
) -> sqlx::Result<Option<Payment>> {
    let query = format!(
        r#"
        SELECT {PAYMENT_COLUMNS} FROM payments
        WHERE booking_id = $1 AND status != 'failed'
        FOR UPDATE
        "#
    );
    sqlx::query_as::<_, Payment>(&query)
        .bind(booking_id)
        .fetch_optional(conn)
        .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_payment(
    conn: &mut PgConnection,
    booking_id: Uuid,
    client_id: Uuid,
    technician_id: Uuid,
    amount: Decimal,
    payment_method: Option<&str>,
    status: &str,
) -> sqlx::Result<Payment> {
    let query = format!(
        r#"
        INSERT INTO payments (
            id, booking_id, client_id, technician_id, amount,
            payment_method, status, transaction_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING {PAYMENT_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Payment>(&query)
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(client_id)
        .bind(technician_id)
        .bind(amount)
        .bind(payment_method)
        .bind(status)
        .fetch_one(conn)
        .await
}

/// Mark a pending payment completed, refreshing the transaction date
pub async fn mark_completed(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Payment> {
    let query = format!(
        r#"
        UPDATE payments
        SET status = 'completed', transaction_date = NOW()
        WHERE id = $1
        RETURNING {PAYMENT_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Payment>(&query)
        .bind(id)
        .fetch_one(conn)
        .await
}

pub async fn get_payment(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Payment>> {
    let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
    sqlx::query_as::<_, Payment>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Payments where the caller is either participant, newest first
pub async fn list_for_participant(
    pool: &PgPool,
    participant_id: Uuid,
    status: Option<&str>,
) -> sqlx::Result<Vec<Payment>> {
    let mut query = format!(
        r#"
        SELECT {PAYMENT_COLUMNS} FROM payments
        WHERE (client_id = $1 OR technician_id = $1)
        "#
    );
    if status.is_some() {
        query.push_str(" AND status = $2");
    }
    query.push_str(" ORDER BY transaction_date DESC");

    let mut builder = sqlx::query_as::<_, Payment>(&query).bind(participant_id);
    if let Some(s) = status {
        builder = builder.bind(s);
    }
    builder.fetch_all(pool).await
}
