use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub time_slot_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Booking row joined with the slot fields callers actually see.
#[derive(Debug, Clone, FromRow)]
pub struct BookingWithSlot {
    pub id: Uuid,
    pub time_slot_id: Uuid,
    pub start_time: OffsetDateTime,
    pub duration_minutes: i32,
}

/// Insert the booking row inside the reservation transaction. The
/// unique constraint on `time_slot_id` makes a lost race surface as a
/// database error here instead of a duplicate row.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    time_slot_id: Uuid,
) -> sqlx::Result<Booking> {
    sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (user_id, time_slot_id)
        VALUES ($1, $2)
        RETURNING id, user_id, time_slot_id, created_at
        "#,
    )
    .bind(user_id)
    .bind(time_slot_id)
    .fetch_one(&mut **tx)
    .await
}

/// Fetch one booking, scoped to its owner. A booking belonging to a
/// different user comes back as `None`, indistinguishable from a
/// missing id.
pub async fn find_for_user(
    db: &PgPool,
    user_id: Uuid,
    booking_id: Uuid,
) -> sqlx::Result<Option<BookingWithSlot>> {
    sqlx::query_as::<_, BookingWithSlot>(
        r#"
        SELECT b.id, b.time_slot_id, s.start_time, s.duration_minutes
        FROM bookings b
        JOIN time_slots s ON s.id = b.time_slot_id
        WHERE b.id = $1 AND b.user_id = $2
        "#,
    )
    .bind(booking_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<BookingWithSlot>> {
    sqlx::query_as::<_, BookingWithSlot>(
        r#"
        SELECT b.id, b.time_slot_id, s.start_time, s.duration_minutes
        FROM bookings b
        JOIN time_slots s ON s.id = b.time_slot_id
        WHERE b.user_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
