//! Booking error types.

use common::EventId;
use domain::{BillingError, DomainError, EventError, NotBookableReason, ReservationError};
use store::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::services::NotificationError;

/// The requested seats cannot be granted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// The event is not taking reservations at all.
    #[error("Event {event_id} is not open for booking: {reason}")]
    NotBookable {
        event_id: EventId,
        reason: NotBookableReason,
    },

    /// Fewer seats are left than requested.
    #[error("Event {event_id} has only {available} seats available, {requested} requested")]
    Insufficient {
        event_id: EventId,
        requested: u32,
        available: u32,
    },
}

/// Errors returned by the booking services.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Seats could not be granted.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// Unknown id, or a record the requester does not own.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The record's current state forbids the operation.
    #[error("Invalid state: {0}")]
    State(String),

    /// Input rejected before touching any record.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another request changed the record first.
    #[error("{entity} {id} was modified concurrently, retry the request")]
    Conflict { entity: &'static str, id: Uuid },

    /// A notification could not be delivered.
    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// Storage failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl BookingError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        BookingError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => BookingError::NotFound { entity, id },
            StoreError::InsufficientSeats {
                event_id,
                requested,
                available,
            } => CapacityError::Insufficient {
                event_id,
                requested,
                available,
            }
            .into(),
            StoreError::ConcurrencyConflict { entity, id, .. } => {
                BookingError::Conflict { entity, id }
            }
            other => BookingError::Store(other),
        }
    }
}

impl From<EventError> for BookingError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::InvalidStatusTransition { .. } | EventError::Closed { .. } => {
                BookingError::State(err.to_string())
            }
            _ => BookingError::Validation(err.to_string()),
        }
    }
}

impl From<ReservationError> for BookingError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::InvalidStateTransition { .. } => BookingError::State(err.to_string()),
            ReservationError::InvalidSeatCount { .. } | ReservationError::TotalOutOfRange { .. } => {
                BookingError::Validation(err.to_string())
            }
        }
    }
}

impl From<BillingError> for BookingError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidInvoiceTransition { .. }
            | BillingError::InvalidPaymentTransition { .. } => BookingError::State(err.to_string()),
            _ => BookingError::Validation(err.to_string()),
        }
    }
}

impl From<DomainError> for BookingError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Event(e) => e.into(),
            DomainError::Reservation(e) => e.into(),
            DomainError::Billing(e) => e.into(),
            DomainError::UnknownVariant(e) => BookingError::Validation(e.to_string()),
        }
    }
}

/// Convenience type alias for booking results.
pub type Result<T> = std::result::Result<T, BookingError>;
