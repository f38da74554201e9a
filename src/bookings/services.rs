use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bookings::repo::{self, Booking};
use crate::error::{is_unique_violation, ApiError};
use crate::slots::repo::{self as slots_repo, TimeSlot};

/// Outcome taxonomy of a reservation attempt. `SlotUnavailable` covers
/// both the ordinary already-booked case and a lost race; callers
/// cannot and should not tell them apart.
#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("The requested time slot does not exist.")]
    SlotNotFound,
    #[error("This time slot is no longer available.")]
    SlotUnavailable,
    #[error(transparent)]
    Persistence(#[from] sqlx::Error),
}

impl From<ReserveError> for ApiError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::SlotNotFound => ApiError::NotFound(err.to_string()),
            ReserveError::SlotUnavailable => ApiError::Conflict(err.to_string()),
            ReserveError::Persistence(e) => ApiError::internal(e),
        }
    }
}

/// Atomically claim `slot_id` for `user_id`.
///
/// The whole read-check-write sequence runs in one transaction: the
/// `FOR UPDATE` load serializes concurrent claims of the same slot, the
/// guarded flag flip re-checks availability, and the unique constraint
/// on `bookings.time_slot_id` backstops anything that slips past both.
/// On success exactly one booking row exists for the slot and its
/// `is_booked` flag is set; on failure nothing is applied.
pub async fn reserve_slot(
    db: &PgPool,
    user_id: Uuid,
    slot_id: Uuid,
) -> Result<(Booking, TimeSlot), ReserveError> {
    let mut tx = db.begin().await?;

    let slot = slots_repo::lock_for_update(&mut tx, slot_id)
        .await?
        .ok_or(ReserveError::SlotNotFound)?;

    if slot.is_booked {
        warn!(%slot_id, %user_id, "reservation of already-booked slot");
        return Err(ReserveError::SlotUnavailable);
    }

    if slots_repo::mark_booked(&mut tx, slot_id).await? != 1 {
        // Lock held, flag observed false, yet the guarded update missed:
        // treat it as a lost race, not corruption.
        warn!(%slot_id, "guarded flag flip affected no rows");
        return Err(ReserveError::SlotUnavailable);
    }

    let booking = repo::insert(&mut tx, user_id, slot_id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(%slot_id, %user_id, "reservation lost race on unique constraint");
                ReserveError::SlotUnavailable
            } else {
                ReserveError::Persistence(e)
            }
        })?;

    tx.commit().await?;

    info!(booking_id = %booking.id, %slot_id, %user_id, "slot reserved");
    Ok((booking, slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn slot_not_found_maps_to_404() {
        let api: ApiError = ReserveError::SlotNotFound.into();
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
        assert_eq!(api.kind(), "not_found");
        assert!(api.to_string().contains("does not exist"));
    }

    #[test]
    fn slot_unavailable_maps_to_conflict() {
        let api: ApiError = ReserveError::SlotUnavailable.into();
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.kind(), "conflict");
        assert!(api.to_string().contains("no longer available"));
    }

    #[test]
    fn persistence_failure_is_opaque_internal() {
        let api: ApiError = ReserveError::Persistence(sqlx::Error::PoolClosed).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.to_string().contains("pool"));
    }
}

// Integration tests against a live Postgres. Run manually:
//   DATABASE_URL=... cargo test -- --ignored
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::auth::repo_types::{Role, User};
    use sqlx::postgres::PgPoolOptions;
    use time::{Duration, OffsetDateTime};

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(&url)
            .await
            .expect("connect");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
        pool
    }

    async fn seed_user(pool: &PgPool) -> User {
        let email = format!("{}@test.local", Uuid::new_v4());
        User::create(pool, "Test User", &email, "hash", Role::User)
            .await
            .expect("create user")
    }

    async fn seed_slot(pool: &PgPool) -> TimeSlot {
        crate::slots::repo::create(pool, OffsetDateTime::now_utc() + Duration::days(1), 60)
            .await
            .expect("create slot")
    }

    async fn bookings_for_slot(pool: &PgPool, slot_id: Uuid) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE time_slot_id = $1")
                .bind(slot_id)
                .fetch_one(pool)
                .await
                .expect("count bookings");
        count
    }

    #[tokio::test]
    #[ignore = "requires a running postgres"]
    async fn reserving_an_open_slot_succeeds_once() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;
        let slot = seed_slot(&pool).await;

        let (booking, reserved) = reserve_slot(&pool, user.id, slot.id).await.expect("reserve");
        assert_eq!(booking.time_slot_id, slot.id);
        assert_eq!(reserved.id, slot.id);

        // Second attempt, same outcome as any already-booked slot.
        let err = reserve_slot(&pool, user.id, slot.id).await.unwrap_err();
        assert!(matches!(err, ReserveError::SlotUnavailable));
        assert_eq!(bookings_for_slot(&pool, slot.id).await, 1);
    }

    #[tokio::test]
    #[ignore = "requires a running postgres"]
    async fn reserving_a_missing_slot_reports_not_found() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;
        let err = reserve_slot(&pool, user.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ReserveError::SlotNotFound));
    }

    #[tokio::test]
    #[ignore = "requires a running postgres"]
    async fn concurrent_reservations_grant_exactly_one() {
        let pool = test_pool().await;
        let slot = seed_slot(&pool).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let slot_id = slot.id;
            handles.push(tokio::spawn(async move {
                let user = seed_user(&pool).await;
                reserve_slot(&pool, user.id, slot_id).await
            }));
        }

        let mut won = 0;
        let mut lost = 0;
        for handle in handles {
            match handle.await.expect("task") {
                Ok(_) => won += 1,
                Err(ReserveError::SlotUnavailable) => lost += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(won, 1);
        assert_eq!(lost, 7);
        assert_eq!(bookings_for_slot(&pool, slot.id).await, 1);

        let (is_booked,): (bool,) =
            sqlx::query_as("SELECT is_booked FROM time_slots WHERE id = $1")
                .bind(slot.id)
                .fetch_one(&pool)
                .await
                .expect("slot flag");
        assert!(is_booked);
    }

    #[tokio::test]
    #[ignore = "requires a running postgres"]
    async fn foreign_bookings_are_invisible() {
        let pool = test_pool().await;
        let owner = seed_user(&pool).await;
        let stranger = seed_user(&pool).await;
        let slot = seed_slot(&pool).await;

        let (booking, _) = reserve_slot(&pool, owner.id, slot.id).await.expect("reserve");

        let found = repo::find_for_user(&pool, owner.id, booking.id).await.expect("query");
        assert!(found.is_some());

        // Same shape as a nonexistent id.
        let hidden = repo::find_for_user(&pool, stranger.id, booking.id).await.expect("query");
        assert!(hidden.is_none());
        let missing = repo::find_for_user(&pool, stranger.id, Uuid::new_v4()).await.expect("query");
        assert!(missing.is_none());
    }
}
