#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use parking_reservations::models::{NewReservation, Reservation};
use parking_reservations::{ReservationStore, StoreError, StoreOps};

/// Wraps a store and tampers with what the engine sees: slot rows can be
/// hidden so the engine's own conflict check passes, and writes can be made to
/// fail the way a lost serialization race does.
pub struct InterposedStore<S> {
    inner: S,
    hide_slot_rows: bool,
    failing_writes: bool,
    queries: AtomicUsize,
}

impl<S: ReservationStore> InterposedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            hide_slot_rows: false,
            failing_writes: false,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn hiding_slot_rows(mut self) -> Self {
        self.hide_slot_rows = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.failing_writes = true;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of list queries issued so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn ops<'a>(&'a self, ops: &'a mut dyn StoreOps) -> InterposedOps<'a> {
        InterposedOps {
            ops,
            hide_slot_rows: self.hide_slot_rows,
            failing_writes: self.failing_writes,
            queries: &self.queries,
        }
    }
}

pub fn serialization_failure() -> StoreError {
    StoreError::from(DieselError::DatabaseError(
        DatabaseErrorKind::SerializationFailure,
        Box::new(String::from("could not serialize access due to concurrent update")),
    ))
}

struct InterposedOps<'a> {
    ops: &'a mut dyn StoreOps,
    hide_slot_rows: bool,
    failing_writes: bool,
    queries: &'a AtomicUsize,
}

impl StoreOps for InterposedOps<'_> {
    fn insert(&mut self, new: &NewReservation) -> Result<Reservation, StoreError> {
        if self.failing_writes {
            return Err(serialization_failure());
        }
        self.ops.insert(new)
    }

    fn delete_by_id(&mut self, reservation_id: i32) -> Result<bool, StoreError> {
        if self.failing_writes {
            return Err(serialization_failure());
        }
        self.ops.delete_by_id(reservation_id)
    }

    fn find_by_id(&mut self, reservation_id: i32) -> Result<Option<Reservation>, StoreError> {
        self.ops.find_by_id(reservation_id)
    }

    fn query_by_slot(&mut self, slot_id: &str) -> Result<Vec<Reservation>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.hide_slot_rows {
            return Ok(Vec::new());
        }
        self.ops.query_by_slot(slot_id)
    }

    fn query_by_user(&mut self, user_id: &str) -> Result<Vec<Reservation>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.ops.query_by_user(user_id)
    }

    fn query_all(&mut self) -> Result<Vec<Reservation>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.ops.query_all()
    }
}

impl<S: ReservationStore> ReservationStore for InterposedStore<S> {
    fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn StoreOps) -> Result<T, StoreError>,
    {
        self.inner.read(|ops| f(&mut self.ops(ops)))
    }

    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreOps) -> Result<T, E>,
    {
        self.inner.atomically(|ops| f(&mut self.ops(ops)))
    }
}
