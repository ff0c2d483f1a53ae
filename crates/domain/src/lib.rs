//! Domain layer for the booking platform.
//!
//! This crate holds the records and rules that every booking flow relies on:
//! - [`Event`] with its seat inventory (`reserve` / `release`) and status lifecycle
//! - [`Reservation`] with its create → update → cancel lifecycle
//! - [`Invoice`] and [`Payment`] billing records
//! - [`Money`] and [`TaxRate`] value objects
//!
//! Nothing here performs I/O. Persistence lives in the `store` crate and the
//! orchestration of a booking (inventory + persistence + billing + notification)
//! lives in the `booking` crate.

pub mod billing;
pub mod error;
pub mod event;
pub mod money;
pub mod reservation;

pub use billing::{
    BillingError, Invoice, InvoiceNumber, InvoiceStatus, Payment, PaymentMethod, PaymentStatus,
    TransactionId,
};
pub use error::{DomainError, UnknownVariant};
pub use event::{
    Category, Event, EventError, EventStatus, EventUpdate, NewEvent, NotBookableReason,
};
pub use money::{Money, TaxRate};
pub use reservation::{
    Reservation, ReservationCode, ReservationError, ReservationStatus, SeatDelta,
};
