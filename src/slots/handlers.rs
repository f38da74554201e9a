use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::auth::extractors::AdminUser;
use crate::error::ApiError;
use crate::slots::dto::{CreateTimeSlotRequest, TimeSlotDto};
use crate::slots::repo;
use crate::state::AppState;

pub fn slot_routes() -> Router<AppState> {
    Router::new()
        .route("/slots", get(list_slots))
        .route("/slots", post(create_slot))
}

fn validate_new_slot(
    start_time: OffsetDateTime,
    duration_minutes: i32,
    now: OffsetDateTime,
) -> Result<(), ApiError> {
    if start_time < now {
        return Err(ApiError::InvalidInput(
            "Start time cannot be in the past.".into(),
        ));
    }
    if duration_minutes <= 0 {
        return Err(ApiError::InvalidInput(
            "Duration must be a positive number.".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_slots(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimeSlotDto>>, ApiError> {
    let slots = repo::list_available(&state.db).await?;
    let items = slots.iter().map(TimeSlotDto::from).collect();
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn create_slot(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<CreateTimeSlotRequest>,
) -> Result<(StatusCode, Json<TimeSlotDto>), ApiError> {
    validate_new_slot(
        payload.start_time,
        payload.duration_minutes,
        OffsetDateTime::now_utc(),
    )?;

    let slot = repo::create(&state.db, payload.start_time, payload.duration_minutes).await?;

    info!(slot_id = %slot.id, admin_id = %admin_id, "time slot created");
    Ok((StatusCode::CREATED, Json(TimeSlotDto::from(&slot))))
}
