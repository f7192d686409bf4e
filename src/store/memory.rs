use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Local;

use super::{ReservationStore, StoreOps};
use crate::error::{StoreError, SLOT_OVERLAP_CONSTRAINT};
use crate::interval::{intervals_overlap, truncate_to_minute};
use crate::models::{NewReservation, Reservation};

/// In-process store. Every unit holds one mutex, so atomic units are trivially
/// serializable.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i32,
    rows: BTreeMap<i32, Reservation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    fn sorted(rows: impl Iterator<Item = Reservation>) -> Vec<Reservation> {
        let mut rows: Vec<Reservation> = rows.collect();
        rows.sort_by_key(|r| (r.start_at, r.reservation_id));
        rows
    }
}

impl StoreOps for Tables {
    fn insert(&mut self, new: &NewReservation) -> Result<Reservation, StoreError> {
        if new.start_at >= new.end_at {
            return Err(StoreError::IntervalConstraint);
        }
        // Mirrors the exclusion constraint on the postgres table.
        if let Some(taken) = self.rows.values().find(|r| {
            r.slot_id == new.slot_id
                && intervals_overlap(r.start_at, r.end_at, new.start_at, new.end_at)
        }) {
            return Err(StoreError::OverlapConstraint(format!(
                "{SLOT_OVERLAP_CONSTRAINT}: conflicts with reservation {}",
                taken.reservation_id
            )));
        }
        self.last_id += 1;
        let reservation = Reservation {
            reservation_id: self.last_id,
            user_id: new.user_id.clone(),
            slot_id: new.slot_id.clone(),
            start_at: new.start_at,
            end_at: new.end_at,
            created_at: truncate_to_minute(Local::now().naive_local()),
        };
        self.rows.insert(reservation.reservation_id, reservation.clone());
        Ok(reservation)
    }

    fn delete_by_id(&mut self, reservation_id: i32) -> Result<bool, StoreError> {
        Ok(self.rows.remove(&reservation_id).is_some())
    }

    fn find_by_id(&mut self, reservation_id: i32) -> Result<Option<Reservation>, StoreError> {
        Ok(self.rows.get(&reservation_id).cloned())
    }

    fn query_by_slot(&mut self, slot_id: &str) -> Result<Vec<Reservation>, StoreError> {
        Ok(MemoryStore::sorted(
            self.rows.values().filter(|r| r.slot_id == slot_id).cloned(),
        ))
    }

    fn query_by_user(&mut self, user_id: &str) -> Result<Vec<Reservation>, StoreError> {
        Ok(MemoryStore::sorted(
            self.rows.values().filter(|r| r.user_id == user_id).cloned(),
        ))
    }

    fn query_all(&mut self) -> Result<Vec<Reservation>, StoreError> {
        Ok(MemoryStore::sorted(self.rows.values().cloned()))
    }
}

impl ReservationStore for MemoryStore {
    fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn StoreOps) -> Result<T, StoreError>,
    {
        let mut tables = self.lock()?;
        f(&mut *tables)
    }

    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreOps) -> Result<T, E>,
    {
        let mut tables = self.lock()?;
        let snapshot = tables.clone();
        let outcome = f(&mut *tables);
        if outcome.is_err() {
            *tables = snapshot;
        }
        outcome
    }
}
