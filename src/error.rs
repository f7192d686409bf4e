use chrono::NaiveDateTime;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Exclusion constraint declared on `reservations` in the initial migration.
pub const SLOT_OVERLAP_CONSTRAINT: &str = "reservations_slot_no_overlap";
/// Check constraint enforcing `start_at < end_at`.
pub const INTERVAL_CHECK_CONSTRAINT: &str = "reservations_interval_ordered";

/// Why a booking request was refused.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("unknown slot '{0}'")]
    InvalidSlot(String),

    #[error("invalid interval: start {start} must be before end {end}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("slot {0} is already reserved for part of the requested time")]
    SlotConflict(String),

    #[error("user {0} already holds a reservation overlapping the requested time")]
    UserConflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CancelError {
    #[error("reservation {0} not found")]
    NotFound(i32),

    #[error("reservation {0} belongs to another user")]
    NotOwner(i32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("store rejected overlapping reservation: {0}")]
    OverlapConstraint(String),

    #[error("store rejected reservation interval")]
    IntervalConstraint,

    #[error("reservation store lock poisoned")]
    Poisoned,

    #[error("database error: {0}")]
    Database(DieselError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(_, info)
                if info.constraint_name() == Some(SLOT_OVERLAP_CONSTRAINT) =>
            {
                StoreError::OverlapConstraint(info.message().to_owned())
            }
            DieselError::DatabaseError(_, info)
                if info.constraint_name() == Some(INTERVAL_CHECK_CONSTRAINT) =>
            {
                StoreError::IntervalConstraint
            }
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    /// The transaction lost a serialization race and was rolled back.
    pub fn is_serialization_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::SerializationFailure,
                _
            ))
        )
    }
}
