use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::bookings::dto::{BookingDetails, CreateBookingRequest};
use crate::bookings::{repo, services};
use crate::error::ApiError;
use crate::slots::TimeSlotDto;
use crate::state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/my-bookings", get(my_bookings))
        .route("/bookings/:id", get(get_booking))
}

#[instrument(skip(state, payload))]
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, HeaderMap, Json<BookingDetails>), ApiError> {
    let (booking, slot) = services::reserve_slot(&state.db, user.id, payload.time_slot_id).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/bookings/{}", booking.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(BookingDetails {
            id: booking.id,
            time_slot: TimeSlotDto::from(&slot),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetails>, ApiError> {
    let booking = repo::find_for_user(&state.db, user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;
    Ok(Json(BookingDetails::from(&booking)))
}

#[instrument(skip(state))]
pub async fn my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    let bookings = repo::list_for_user(&state.db, user.id).await?;
    let items = bookings.iter().map(BookingDetails::from).collect();
    Ok(Json(items))
}
