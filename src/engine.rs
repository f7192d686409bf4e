use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};

use crate::config::{BookingPolicy, SameTimeExit};
use crate::error::{BookingError, CancelError, StoreError};
use crate::interval::{normalize_interval, truncate_to_minute, TimeRange};
use crate::models::{
    Availability, Cancellation, NewReservation, Reservation, ReservationPhase, SlotState,
    SlotStatus, UserReservation,
};
use crate::slots::{self, SLOTS};
use crate::store::{ReservationStore, StoreOps};

/// Admission control and occupancy queries over a reservation store.
pub struct ReservationEngine<S> {
    store: S,
    policy: BookingPolicy,
}

impl<S: ReservationStore> ReservationEngine<S> {
    pub fn new(store: S, policy: BookingPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn is_valid_slot(&self, slot_id: &str) -> bool {
        slots::is_valid_slot(slot_id)
    }

    /// Turns a booking form (date, entry, exit) into a range, honoring the
    /// configured treatment of exit == entry.
    pub fn normalize(
        &self,
        date: NaiveDate,
        entry: NaiveTime,
        exit: NaiveTime,
    ) -> Result<TimeRange, BookingError> {
        let range = normalize_interval(date, entry, exit)?;
        if self.policy.same_time_exit == SameTimeExit::Reject
            && range.duration() == Duration::days(1)
        {
            return Err(BookingError::InvalidInterval {
                start: range.start(),
                end: range.start(),
            });
        }
        Ok(range)
    }

    pub fn find_slot_conflicts(
        &self,
        slot_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.store.read(|ops| slot_conflicts(ops, slot_id, range))
    }

    pub fn find_user_conflicts(
        &self,
        user_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.store.read(|ops| user_conflicts(ops, user_id, range))
    }

    pub fn book(
        &self,
        user_id: &str,
        slot_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Reservation, BookingError> {
        if !self.is_valid_slot(slot_id) {
            debug!("rejected booking by {}: unknown slot '{}'", user_id, slot_id);
            return Err(BookingError::InvalidSlot(slot_id.to_owned()));
        }

        let range = TimeRange::new(truncate_to_minute(start), truncate_to_minute(end))?;
        let one_per_user = self.policy.one_booking_per_user;

        let reservation = self
            .store
            .atomically(|ops| -> Result<Reservation, BookingError> {
                if !slot_conflicts(ops, slot_id, &range)?.is_empty() {
                    return Err(BookingError::SlotConflict(slot_id.to_owned()));
                }

                if one_per_user && !user_conflicts(ops, user_id, &range)?.is_empty() {
                    return Err(BookingError::UserConflict(user_id.to_owned()));
                }

                let new_reservation = NewReservation {
                    user_id: user_id.to_owned(),
                    slot_id: slot_id.to_owned(),
                    start_at: range.start(),
                    end_at: range.end(),
                };
                Ok(ops.insert(&new_reservation)?)
            })
            .map_err(|e| match e {
                BookingError::Store(StoreError::OverlapConstraint(detail)) => {
                    debug!("store backstop rejected booking on {}: {}", slot_id, detail);
                    BookingError::SlotConflict(slot_id.to_owned())
                }
                BookingError::Store(err) if err.is_serialization_failure() => {
                    debug!("booking on {} lost a serialization race: {}", slot_id, err);
                    BookingError::SlotConflict(slot_id.to_owned())
                }
                BookingError::Store(StoreError::IntervalConstraint) => {
                    BookingError::InvalidInterval {
                        start: range.start(),
                        end: range.end(),
                    }
                }
                other => {
                    debug!("rejected booking by {} on {}: {}", user_id, slot_id, other);
                    other
                }
            })?;

        info!(
            "reservation {} booked: user {} slot {} from {} to {}",
            reservation.reservation_id,
            reservation.user_id,
            reservation.slot_id,
            reservation.start_at,
            reservation.end_at
        );

        Ok(reservation)
    }

    pub fn cancel(&self, reservation_id: i32, user_id: &str) -> Result<Cancellation, CancelError> {
        self.cancel_at(reservation_id, user_id, Local::now().naive_local())
    }

    /// Deletes a reservation owned by `user_id`. A reservation that is in
    /// progress at `now` counts as an early termination.
    pub fn cancel_at(
        &self,
        reservation_id: i32,
        user_id: &str,
        now: NaiveDateTime,
    ) -> Result<Cancellation, CancelError> {
        let reservation = self.store.atomically(|ops| -> Result<Reservation, CancelError> {
            let reservation = ops
                .find_by_id(reservation_id)?
                .ok_or(CancelError::NotFound(reservation_id))?;

            if reservation.user_id != user_id {
                return Err(CancelError::NotOwner(reservation_id));
            }

            if !ops.delete_by_id(reservation_id)? {
                return Err(CancelError::NotFound(reservation_id));
            }

            Ok(reservation)
        });

        let reservation = match reservation {
            Ok(r) => r,
            Err(e) => {
                debug!("cancel of reservation {} by {} refused: {}", reservation_id, user_id, e);
                return Err(e);
            }
        };

        let early_termination = reservation.is_active_at(now);
        if early_termination {
            info!(
                "reservation {} on slot {} ended early by {}",
                reservation_id, reservation.slot_id, user_id
            );
        } else {
            info!(
                "reservation {} on slot {} cancelled by {}",
                reservation_id, reservation.slot_id, user_id
            );
        }

        Ok(Cancellation {
            reservation,
            early_termination,
        })
    }

    /// Occupancy of every slot at `instant`, read fresh from the store.
    pub fn availability(
        &self,
        instant: NaiveDateTime,
        requester: Option<&str>,
    ) -> Result<Availability, StoreError> {
        let all = self.store.read(|ops| ops.query_all())?;

        let slots = SLOTS
            .iter()
            .map(|&slot_id| {
                let occupants: Vec<&Reservation> = all
                    .iter()
                    .filter(|r| r.slot_id == slot_id && r.is_active_at(instant))
                    .collect();

                let state = if occupants.is_empty() {
                    SlotState::Free
                } else if requester
                    .is_some_and(|user| occupants.iter().any(|r| r.user_id == user))
                {
                    SlotState::OccupiedByRequester
                } else {
                    SlotState::Occupied
                };

                SlotStatus { slot_id, state }
            })
            .collect();

        Ok(Availability { at: instant, slots })
    }

    /// Catalog slots with no reservation overlapping `range`, in catalog order.
    pub fn available_slots(&self, range: &TimeRange) -> Result<Vec<&'static str>, StoreError> {
        let all = self.store.read(|ops| ops.query_all())?;

        Ok(SLOTS
            .iter()
            .copied()
            .filter(|&slot_id| !all.iter().any(|r| r.slot_id == slot_id && r.overlaps(range)))
            .collect())
    }

    pub fn reservations_for_user(
        &self,
        user_id: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<UserReservation>, StoreError> {
        let rows = self.store.read(|ops| ops.query_by_user(user_id))?;

        Ok(rows
            .into_iter()
            .map(|reservation| UserReservation {
                phase: ReservationPhase::of(&reservation, now),
                reservation,
            })
            .collect())
    }
}

fn slot_conflicts(
    ops: &mut dyn StoreOps,
    slot_id: &str,
    range: &TimeRange,
) -> Result<Vec<Reservation>, StoreError> {
    Ok(ops
        .query_by_slot(slot_id)?
        .into_iter()
        .filter(|r| r.overlaps(range))
        .collect())
}

fn user_conflicts(
    ops: &mut dyn StoreOps,
    user_id: &str,
    range: &TimeRange,
) -> Result<Vec<Reservation>, StoreError> {
    Ok(ops
        .query_by_user(user_id)?
        .into_iter()
        .filter(|r| r.overlaps(range))
        .collect())
}
