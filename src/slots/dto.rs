use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::slots::repo::TimeSlot;

#[derive(Debug, Deserialize)]
pub struct CreateTimeSlotRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    pub duration_minutes: i32,
}

/// Slot as exposed to clients; `is_booked` stays internal because the
/// public listing only ever contains available slots.
#[derive(Debug, Serialize)]
pub struct TimeSlotDto {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    pub duration_minutes: i32,
}

impl From<&TimeSlot> for TimeSlotDto {
    fn from(slot: &TimeSlot) -> Self {
        Self {
            id: slot.id,
            start_time: slot.start_time,
            duration_minutes: slot.duration_minutes,
        }
    }
}
