//! Shared types for the booking platform.
//!
//! Every persisted entity is addressed by its own UUID newtype so that an
//! event id can never be passed where a reservation id is expected.

mod ids;
mod version;

pub use ids::{EventId, InvoiceId, PaymentId, ReservationId, UserId};
pub use version::Version;
