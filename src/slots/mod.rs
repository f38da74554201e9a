mod dto;
pub mod handlers;
pub mod repo;

pub use dto::TimeSlotDto;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::slot_routes()
}
