//! Notification database queries

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::types::{Notification, ReadFilter};

/// Append a notification. Called inside booking/payment/review
/// transactions so a rolled-back transition never leaves a stray message
/// behind.
pub async fn insert(
    conn: &mut PgConnection,
    recipient_id: Uuid,
    message: &str,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO notifications (id, recipient_id, message) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(recipient_id)
        .bind(message)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn list_for_recipient(
    pool: &PgPool,
    recipient_id: Uuid,
    filter: ReadFilter,
) -> sqlx::Result<Vec<Notification>> {
    let mut query = String::from(
        r#"
        SELECT id, recipient_id, message, is_read, created_at
        FROM notifications
        WHERE recipient_id = $1
        "#,
    );
    match filter {
        ReadFilter::Read => query.push_str(" AND is_read = TRUE"),
        ReadFilter::Unread => query.push_str(" AND is_read = FALSE"),
        ReadFilter::All => {}
    }
    query.push_str(" ORDER BY created_at DESC");

    sqlx::query_as::<_, Notification>(&query)
        .bind(recipient_id)
        .fetch_all(pool)
        .await
}

pub async fn unread_count(pool: &PgPool, recipient_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(recipient_id)
    .fetch_one(pool)
    .await
}

pub async fn mark_read(pool: &PgPool, id: Uuid, recipient_id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
    )
    .bind(id)
    .bind(recipient_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_read(pool: &PgPool, recipient_id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(recipient_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
