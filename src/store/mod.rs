//! Persistence contract for reservations.
//!
//! Engine operations run either as a plain read ([`ReservationStore::read`]) or
//! as a single atomic unit ([`ReservationStore::atomically`]). Admission control
//! checks for conflicts and inserts inside one unit, so two overlapping requests
//! can never both be admitted.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{DbPool, PgStore};

use crate::error::StoreError;
use crate::models::{NewReservation, Reservation};

/// Row-level operations available inside a store unit.
///
/// List operations return rows ordered by `start_at`.
pub trait StoreOps {
    fn insert(&mut self, new: &NewReservation) -> Result<Reservation, StoreError>;

    /// Returns `false` when no row had that id.
    fn delete_by_id(&mut self, reservation_id: i32) -> Result<bool, StoreError>;

    fn find_by_id(&mut self, reservation_id: i32) -> Result<Option<Reservation>, StoreError>;

    fn query_by_slot(&mut self, slot_id: &str) -> Result<Vec<Reservation>, StoreError>;

    fn query_by_user(&mut self, user_id: &str) -> Result<Vec<Reservation>, StoreError>;

    fn query_all(&mut self) -> Result<Vec<Reservation>, StoreError>;
}

pub trait ReservationStore: Send + Sync {
    fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn StoreOps) -> Result<T, StoreError>;

    /// Runs `f` serialized against every other atomic unit. When `f` fails,
    /// nothing it wrote is kept.
    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreOps) -> Result<T, E>;
}
