//! Review database queries

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::types::ReviewDetail;

const REVIEW_DETAIL_COLUMNS: &str = r#"
    r.id, r.booking_id, r.client_id, r.technician_id, r.rating, r.comment,
    r.created_at,
    c.name as client_name, c.surname as client_surname
"#;

/// Whether the client already reviewed this booking. Runs inside the
/// creating transaction, after the booking row lock, so two racing
/// creates cannot both pass.
pub async fn exists_for_booking(
    conn: &mut PgConnection,
    booking_id: Uuid,
    client_id: Uuid,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE booking_id = $1 AND client_id = $2)",
    )
    .bind(booking_id)
    .bind(client_id)
    .fetch_one(conn)
    .await
}

pub async fn insert_review(
    conn: &mut PgConnection,
    booking_id: Uuid,
    client_id: Uuid,
    technician_id: Uuid,
    rating: i32,
    comment: Option<&str>,
) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO reviews (id, booking_id, client_id, technician_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(booking_id)
    .bind(client_id)
    .bind(technician_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(conn)
    .await
}

/// Get a review with the reviewer's name, inside a transaction
pub async fn get_detail_tx(
    conn: &mut PgConnection,
    id: Uuid,
) -> sqlx::Result<Option<ReviewDetail>> {
    let query = format!(
        r#"
        SELECT {REVIEW_DETAIL_COLUMNS}
        FROM reviews r
        JOIN clients c ON r.client_id = c.id
        WHERE r.id = $1
        "#
    );
    sqlx::query_as::<_, ReviewDetail>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// One page of a technician's reviews, newest first
pub async fn list_for_technician(
    pool: &PgPool,
    technician_id: Uuid,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<ReviewDetail>> {
    let query = format!(
        r#"
        SELECT {REVIEW_DETAIL_COLUMNS}
        FROM reviews r
        JOIN clients c ON r.client_id = c.id
        WHERE r.technician_id = $1
        ORDER BY r.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    );
    sqlx::query_as::<_, ReviewDetail>(&query)
        .bind(technician_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

/// Count and rating average over all of a technician's reviews
pub async fn stats_for_technician(
    pool: &PgPool,
    technician_id: Uuid,
) -> sqlx::Result<(i64, Option<f64>)> {
    sqlx::query_as::<_, (i64, Option<f64>)>(
        "SELECT COUNT(*), AVG(rating)::float8 FROM reviews WHERE technician_id = $1",
    )
    .bind(technician_id)
    .fetch_one(pool)
    .await
}
