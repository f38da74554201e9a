use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bookings::repo::BookingWithSlot;
use crate::slots::TimeSlotDto;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub time_slot_id: Uuid,
}

/// Booking joined with its slot, the shape every booking read returns.
#[derive(Debug, Serialize)]
pub struct BookingDetails {
    pub id: Uuid,
    pub time_slot: TimeSlotDto,
}

impl From<&BookingWithSlot> for BookingDetails {
    fn from(row: &BookingWithSlot) -> Self {
        Self {
            id: row.id,
            time_slot: TimeSlotDto {
                id: row.time_slot_id,
                start_time: row.start_time,
                duration_minutes: row.duration_minutes,
            },
        }
    }
}
