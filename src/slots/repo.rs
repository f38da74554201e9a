use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct TimeSlot {
    pub id: Uuid,
    pub start_time: OffsetDateTime,
    pub duration_minutes: i32,
    pub is_booked: bool,
    pub created_at: OffsetDateTime,
}

pub async fn list_available(db: &PgPool) -> sqlx::Result<Vec<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>(
        r#"
        SELECT id, start_time, duration_minutes, is_booked, created_at
        FROM time_slots
        WHERE NOT is_booked
        ORDER BY start_time
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn create(
    db: &PgPool,
    start_time: OffsetDateTime,
    duration_minutes: i32,
) -> sqlx::Result<TimeSlot> {
    sqlx::query_as::<_, TimeSlot>(
        r#"
        INSERT INTO time_slots (start_time, duration_minutes, is_booked)
        VALUES ($1, $2, FALSE)
        RETURNING id, start_time, duration_minutes, is_booked, created_at
        "#,
    )
    .bind(start_time)
    .bind(duration_minutes)
    .fetch_one(db)
    .await
}

/// Load a slot inside a reservation transaction, taking a row lock.
/// Concurrent claims of the same slot serialize here; other slots are
/// untouched.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> sqlx::Result<Option<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>(
        r#"
        SELECT id, start_time, duration_minutes, is_booked, created_at
        FROM time_slots
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// Flip `is_booked`, guarded so an already-booked slot is never flipped
/// twice. Returns the number of rows changed (0 or 1).
pub async fn mark_booked(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE time_slots
        SET is_booked = TRUE
        WHERE id = $1 AND is_booked = FALSE
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}
