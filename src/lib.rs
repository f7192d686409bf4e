//! Parking slot reservations: a fixed catalog of slots, interval-overlap
//! admission control, and a small JSON API on top.

pub mod config;
pub mod engine;
pub mod error;
pub mod interval;
pub mod models;
pub mod routes;
pub mod schema;
pub mod slots;
pub mod store;

pub use config::{BookingPolicy, Config, SameTimeExit};
pub use engine::ReservationEngine;
pub use error::{BookingError, CancelError, StoreError};
pub use interval::{normalize_interval, TimeRange};
pub use store::{MemoryStore, PgStore, ReservationStore, StoreOps};
