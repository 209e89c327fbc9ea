//! Technician database queries

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::types::{DirectoryTechnician, Technician};

const TECHNICIAN_COLUMNS: &str = r#"
    id, name, surname, email, phone, location_name, latitude, longitude,
    service_types, experience_years, is_available, is_verified,
    created_at, updated_at
"#;

pub async fn get_technician(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Technician>> {
    let query = format!("SELECT {TECHNICIAN_COLUMNS} FROM technicians WHERE id = $1");
    sqlx::query_as::<_, Technician>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

const AVAILABILITY_LOCK_SQL: &str =
    "SELECT is_available FROM technicians WHERE id = $1 FOR UPDATE";

/// Availability check inside a booking transaction. Locks the technician
/// row, so concurrent creates against the same technician serialize and
/// the schedule-conflict check that follows sees any booking a racing
/// create has committed.
pub async fn lock_availability(
    conn: &mut PgConnection,
    id: Uuid,
) -> sqlx::Result<Option<bool>> {
    sqlx::query_scalar::<_, bool>(AVAILABILITY_LOCK_SQL)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Directory half of the proximity search: available technicians whose
/// name, surname or any service tag matches the filter, with the review
/// average joined in. An empty filter matches everyone. Distance filtering
/// happens in the search engine, not here.
pub async fn search_directory(
    pool: &PgPool,
    filter: &str,
) -> sqlx::Result<Vec<DirectoryTechnician>> {
    sqlx::query_as::<_, DirectoryTechnician>(
        r#"
        SELECT
            t.id, t.name, t.surname, t.location_name,
            t.latitude, t.longitude, t.service_types, t.experience_years,
            t.is_verified,
            (SELECT AVG(rating)::float8 FROM reviews r
             WHERE r.technician_id = t.id) as avg_rating
        FROM technicians t
        WHERE t.is_available = TRUE
        AND (
            $1 = ''
            OR t.name ILIKE '%' || $1 || '%'
            OR t.surname ILIKE '%' || $1 || '%'
            OR EXISTS (
                SELECT 1 FROM unnest(t.service_types) AS service
                WHERE service ILIKE '%' || $1 || '%'
            )
        )
        "#,
    )
    .bind(filter)
    .fetch_all(pool)
    .await
}

/// Toggle a technician's availability flag
pub async fn set_availability(
    pool: &PgPool,
    id: Uuid,
    is_available: bool,
) -> sqlx::Result<Option<Technician>> {
    let query = format!(
        r#"
        UPDATE technicians
        SET is_available = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {TECHNICIAN_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Technician>(&query)
        .bind(id)
        .bind(is_available)
        .fetch_optional(pool)
        .await
}

/// Review average for a single technician profile
pub async fn avg_rating(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<f64>> {
    sqlx::query_scalar::<_, Option<f64>>(
        "SELECT AVG(rating)::float8 FROM reviews WHERE technician_id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without the row lock, two creates for the same technician can both
    // pass the schedule-conflict check before either insert commits.
    #[test]
    fn availability_check_locks_the_technician_row() {
        assert!(AVAILABILITY_LOCK_SQL.ends_with("FOR UPDATE"));
    }
}
