//! Reservations and their lifecycle.

mod model;
mod status;

pub use model::{Reservation, ReservationCode, SeatDelta};
pub use status::ReservationStatus;

use thiserror::Error;

use crate::money::Money;

/// Errors raised by the reservation lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// Seat counts must be positive.
    #[error("Invalid seat count: {seats} (must be greater than 0)")]
    InvalidSeatCount { seats: u32 },

    /// Price times seats does not fit in a money amount.
    #[error("Total price of {seats} seats at {price_per_person} each is out of range")]
    TotalOutOfRange {
        seats: u32,
        price_per_person: Money,
    },

    /// Reservation is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: ReservationStatus,
        action: &'static str,
    },
}
