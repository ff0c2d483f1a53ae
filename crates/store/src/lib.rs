//! Storage layer for the booking platform.
//!
//! [`BookingStore`] groups the three repository traits every booking flow
//! needs. Two implementations are provided:
//! - [`InMemoryStore`] for tests and single-process deployments
//! - [`PostgresStore`] backed by a `sqlx` connection pool
//!
//! Seat counters are only ever changed through [`EventRepository::reserve_seats`]
//! and [`EventRepository::release_seats`], which both implementations perform as
//! a single conditional update so concurrent bookings cannot oversell an event.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{EventQuery, ReservationQuery};
pub use repository::{
    BillingRepository, BookingStore, BookingStoreExt, EventRepository, ReservationRepository,
};
