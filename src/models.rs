use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

use crate::interval::{intervals_overlap, minute_format, TimeRange};
use crate::schema::reservations;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = reservations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Reservation {
    pub reservation_id: i32,
    pub user_id: String,
    pub slot_id: String,
    #[serde(with = "minute_format")]
    pub start_at: NaiveDateTime,
    #[serde(with = "minute_format")]
    pub end_at: NaiveDateTime,
    #[serde(with = "minute_format")]
    pub created_at: NaiveDateTime,
}

impl Reservation {
    pub fn overlaps(&self, range: &TimeRange) -> bool {
        intervals_overlap(self.start_at, self.end_at, range.start(), range.end())
    }

    pub fn is_active_at(&self, instant: NaiveDateTime) -> bool {
        self.start_at <= instant && instant < self.end_at
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reservations)]
pub struct NewReservation {
    pub user_id: String,
    pub slot_id: String,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Free,
    Occupied,
    OccupiedByRequester,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub slot_id: &'static str,
    pub state: SlotState,
}

/// Occupancy of every catalog slot at one instant, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    #[serde(with = "minute_format")]
    pub at: NaiveDateTime,
    pub slots: Vec<SlotStatus>,
}

impl Availability {
    pub fn state_of(&self, slot_id: &str) -> Option<SlotState> {
        self.slots
            .iter()
            .find(|s| s.slot_id == slot_id)
            .map(|s| s.state)
    }

    pub fn free_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Free)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPhase {
    Upcoming,
    Active,
    Completed,
}

impl ReservationPhase {
    pub fn of(reservation: &Reservation, now: NaiveDateTime) -> Self {
        if now < reservation.start_at {
            ReservationPhase::Upcoming
        } else if now < reservation.end_at {
            ReservationPhase::Active
        } else {
            ReservationPhase::Completed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReservation {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub phase: ReservationPhase,
}

/// A deleted reservation. `early_termination` is set when the reservation was
/// in progress at the time of cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub reservation: Reservation,
    pub early_termination: bool,
}

// Request/Response models for API
#[derive(Debug, Deserialize, Clone)]
pub struct BookSlotRequest {
    pub user_id: String,
    pub slot_id: String,
    pub date: String,
    pub entry_time: String,
    pub exit_time: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CancelRequest {
    pub reservation_id: i32,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub at: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub date: String,
    pub entry_time: String,
    pub exit_time: String,
}

#[derive(Debug, Serialize)]
pub struct AvailableSlotsResponse {
    #[serde(flatten)]
    pub window: TimeRange,
    pub slots: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub early_termination: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub message: String,
}
