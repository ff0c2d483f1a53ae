//! Bookable events and their seat inventory.

mod model;
mod status;

pub use model::{Event, EventUpdate, NewEvent, NotBookableReason};
pub use status::{Category, EventStatus};

use thiserror::Error;

/// Errors raised by event inventory and lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Title is required.
    #[error("Event title is required")]
    TitleRequired,

    /// Capacity must be a positive integer.
    #[error("Invalid capacity: {capacity} (must be greater than 0)")]
    InvalidCapacity { capacity: u32 },

    /// Price outside `0..=Event::MAX_PRICE`.
    #[error("Invalid price: {cents} cents (must be between 0 and {max} cents)", max = Event::MAX_PRICE.cents())]
    InvalidPrice { cents: i64 },

    /// Initial availability larger than the room.
    #[error("Available seats {available} exceed capacity {capacity}")]
    AvailabilityExceedsCapacity { available: u32, capacity: u32 },

    /// Events start life as draft or pending.
    #[error("Events cannot be created in {status} status")]
    InvalidInitialStatus { status: EventStatus },

    /// Seat counts must be positive.
    #[error("Invalid seat count: {seats} (must be greater than 0)")]
    InvalidSeatCount { seats: u32 },

    /// Not enough seats left.
    #[error("Only {available} seats available, {requested} requested")]
    InsufficientSeats { requested: u32, available: u32 },

    /// The status lifecycle does not allow this move.
    #[error("Invalid status transition: cannot go from {from} to {to}")]
    InvalidStatusTransition { from: EventStatus, to: EventStatus },

    /// Capacity cannot shrink below the seats already sold.
    #[error("Capacity {capacity} is below the {registered} seats already reserved")]
    CapacityBelowRegistered { capacity: u32, registered: u32 },

    /// Cancelled and finished events are read-only.
    #[error("Event is {status} and can no longer be modified")]
    Closed { status: EventStatus },
}
