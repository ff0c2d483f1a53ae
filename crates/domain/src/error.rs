//! Domain error types.

use thiserror::Error;

use crate::billing::BillingError;
use crate::event::EventError;
use crate::reservation::ReservationError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An event inventory or lifecycle rule was violated.
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// A reservation lifecycle rule was violated.
    #[error("Reservation error: {0}")]
    Reservation(#[from] ReservationError),

    /// An invoice or payment rule was violated.
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    /// A stored enum value could not be decoded.
    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),
}

/// A textual enum value that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
