//! Booking database queries
//!
//! Mutating queries take a `&mut PgConnection` so the state machine can run
//! them inside one transaction, after locking the booking row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::types::{Booking, BookingDetail, PayableBooking, TechnicianDashboard};

const BOOKING_COLUMNS: &str = r#"
    id, client_id, technician_id, service_type, description, status, price,
    start_date, end_date,
    client_address, client_city, client_postal_code, client_province,
    client_country, client_latitude, client_longitude,
    cancelled, cancellation_reason, created_at, updated_at
"#;

const DETAIL_COLUMNS: &str = r#"
    b.id, b.client_id, b.technician_id, b.service_type, b.description,
    b.status, b.price, b.start_date, b.end_date,
    b.cancelled, b.cancellation_reason, b.created_at, b.updated_at,
    c.name as client_name, c.surname as client_surname,
    t.name as technician_name, t.surname as technician_surname
"#;

/// Fetch a booking row with a row-level lock, blocking concurrent
/// transitions until the surrounding transaction resolves.
pub async fn lock_booking(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Booking>> {
    let query = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
    );
    sqlx::query_as::<_, Booking>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Inclusive-overlap conflict test against non-terminal bookings for a
/// technician. `[start, end]` intersects `[b.start, b.end]` when
/// `b.start <= end AND b.end >= start`.
pub async fn has_schedule_conflict(
    conn: &mut PgConnection,
    technician_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE technician_id = $1
            AND status NOT IN ('cancelled', 'rejected', 'completed')
            AND start_date IS NOT NULL
            AND end_date IS NOT NULL
            AND start_date <= $3
            AND end_date >= $2
        )
        "#,
    )
    .bind(technician_id)
    .bind(start)
    .bind(end)
    .fetch_one(conn)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_booking(
    conn: &mut PgConnection,
    client_id: Uuid,
    technician_id: Uuid,
    service_type: &str,
    description: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    address: [Option<&str>; 5],
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> sqlx::Result<Booking> {
    let query = format!(
        r#"
        INSERT INTO bookings (
            id, client_id, technician_id, service_type, description, status,
            start_date, end_date,
            client_address, client_city, client_postal_code, client_province,
            client_country, client_latitude, client_longitude
        )
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {BOOKING_COLUMNS}
        "#
    );
    let [addr, city, postal, province, country] = address;
    sqlx::query_as::<_, Booking>(&query)
        .bind(Uuid::new_v4())
        .bind(client_id)
        .bind(technician_id)
        .bind(service_type)
        .bind(description)
        .bind(start_date)
        .bind(end_date)
        .bind(addr)
        .bind(city)
        .bind(postal)
        .bind(province)
        .bind(country)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(conn)
        .await
}

/// Record a technician price offer (pending → offered)
pub async fn set_offer(
    conn: &mut PgConnection,
    id: Uuid,
    price: Decimal,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE bookings SET status = 'offered', price = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(price)
    .execute(conn)
    .await?;
    Ok(())
}

/// Plain status change; timestamps untouched beyond updated_at
pub async fn set_status(conn: &mut PgConnection, id: Uuid, status: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}

/// Declined offers remove the booking row entirely
pub async fn delete_booking(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Start work: confirmed → in_progress, start_date stamped to now
pub async fn mark_started(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE bookings SET status = 'in_progress', start_date = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Finish work: in_progress → completed, end_date stamped to now
pub async fn mark_completed(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE bookings SET status = 'completed', end_date = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_cancelled(
    conn: &mut PgConnection,
    id: Uuid,
    reason: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE bookings
        SET status = 'cancelled', cancelled = TRUE, cancellation_reason = $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(reason)
    .execute(conn)
    .await?;
    Ok(())
}

/// Override path: direct status and optional price mutation
pub async fn override_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: &str,
    price: Option<Decimal>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE bookings
        SET status = $2, price = COALESCE($3, price), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(price)
    .execute(conn)
    .await?;
    Ok(())
}

/// Get a booking with joined participant names
pub async fn get_detail(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<BookingDetail>> {
    let query = format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM bookings b
        JOIN clients c ON b.client_id = c.id
        JOIN technicians t ON b.technician_id = t.id
        WHERE b.id = $1
        "#
    );
    sqlx::query_as::<_, BookingDetail>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Same join, inside a transaction
pub async fn get_detail_tx(
    conn: &mut PgConnection,
    id: Uuid,
) -> sqlx::Result<Option<BookingDetail>> {
    let query = format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM bookings b
        JOIN clients c ON b.client_id = c.id
        JOIN technicians t ON b.technician_id = t.id
        WHERE b.id = $1
        "#
    );
    sqlx::query_as::<_, BookingDetail>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Bookings for a client, newest first, optional status filter
pub async fn list_for_client(
    pool: &PgPool,
    client_id: Uuid,
    status: Option<&str>,
) -> sqlx::Result<Vec<BookingDetail>> {
    list_for_participant(pool, "b.client_id", client_id, status).await
}

/// Jobs for a technician, newest first, optional status filter
pub async fn list_for_technician(
    pool: &PgPool,
    technician_id: Uuid,
    status: Option<&str>,
) -> sqlx::Result<Vec<BookingDetail>> {
    list_for_participant(pool, "b.technician_id", technician_id, status).await
}

async fn list_for_participant(
    pool: &PgPool,
    column: &str,
    id: Uuid,
    status: Option<&str>,
) -> sqlx::Result<Vec<BookingDetail>> {
    let mut query = format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM bookings b
        JOIN clients c ON b.client_id = c.id
        JOIN technicians t ON b.technician_id = t.id
        WHERE {column} = $1
        "#
    );
    if status.is_some() {
        query.push_str(" AND b.status = $2");
    }
    query.push_str(" ORDER BY b.created_at DESC");

    let mut builder = sqlx::query_as::<_, BookingDetail>(&query).bind(id);
    if let Some(s) = status {
        builder = builder.bind(s);
    }
    builder.fetch_all(pool).await
}

/// The five most recent bookings for a client dashboard
pub async fn recent_for_client(pool: &PgPool, client_id: Uuid) -> sqlx::Result<Vec<BookingDetail>> {
    let query = format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM bookings b
        JOIN clients c ON b.client_id = c.id
        JOIN technicians t ON b.technician_id = t.id
        WHERE b.client_id = $1
        ORDER BY b.created_at DESC
        LIMIT 5
        "#
    );
    sqlx::query_as::<_, BookingDetail>(&query)
        .bind(client_id)
        .fetch_all(pool)
        .await
}

/// Completed bookings with no payment row yet
pub async fn payable_for_client(
    pool: &PgPool,
    client_id: Uuid,
) -> sqlx::Result<Vec<PayableBooking>> {
    sqlx::query_as::<_, PayableBooking>(
        r#"
        SELECT
            b.id, b.service_type, b.description, b.status, b.price,
            b.created_at, b.start_date, b.end_date,
            t.id as technician_id, t.name as technician_name,
            t.surname as technician_surname
        FROM bookings b
        JOIN technicians t ON b.technician_id = t.id
        WHERE b.client_id = $1
        AND b.status = 'completed'
        AND NOT EXISTS (
            SELECT 1 FROM payments p
            WHERE p.booking_id = b.id AND p.status != 'failed'
        )
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(client_id)
    .fetch_all(pool)
    .await
}

/// Status counters and earnings for the technician dashboard
pub async fn dashboard_counts(
    pool: &PgPool,
    technician_id: Uuid,
) -> sqlx::Result<TechnicianDashboard> {
    sqlx::query_as::<_, TechnicianDashboard>(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'pending') as pending_requests,
            COUNT(*) FILTER (WHERE status = 'confirmed') as confirmed_bookings,
            COUNT(*) FILTER (WHERE status = 'completed') as completed_bookings,
            COALESCE(SUM(price) FILTER (WHERE status = 'completed'), 0) as total_earnings
        FROM bookings
        WHERE technician_id = $1
        "#,
    )
    .bind(technician_id)
    .fetch_one(pool)
    .await
}

/// Completed bookings carrying client coordinates, for distance statistics
pub async fn completed_with_location(
    pool: &PgPool,
    technician_id: Uuid,
) -> sqlx::Result<Vec<Booking>> {
    let query = format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE technician_id = $1
        AND status = 'completed'
        AND client_latitude IS NOT NULL
        AND client_longitude IS NOT NULL
        ORDER BY start_date DESC
        "#
    );
    sqlx::query_as::<_, Booking>(&query)
        .bind(technician_id)
        .fetch_all(pool)
        .await
}
