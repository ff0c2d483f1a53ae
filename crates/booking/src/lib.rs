//! Booking services.
//!
//! This crate orchestrates the seat inventory, reservation records, billing
//! and notifications:
//! - [`EventCatalog`] lets staff publish and edit events
//! - [`ReservationService`] runs the create → update → cancel lifecycle
//! - [`BillingService`] issues invoices and records payments
//!
//! Seats are taken with a single conditional store update before the
//! reservation row is written. If that write fails the seats are released
//! again. Invoicing and notification run afterwards on a best-effort basis and
//! never undo a reservation.

pub mod billing;
pub mod error;
pub mod events;
pub mod policy;
pub mod reservations;
pub mod services;
pub mod ticket;

pub use billing::{BillingService, InvoiceDetails, PaymentReceipt, PaymentRequest};
pub use error::{BookingError, CapacityError, Result};
pub use events::{EventCatalog, EventDetails};
pub use policy::BookingPolicy;
pub use reservations::{
    BookingWarning, NewReservation, ReservationChange, ReservationCreated, ReservationDetails,
    ReservationList, ReservationService, ReservationUpdated,
};
pub use services::{
    Confirmation, ConfirmationKind, InMemoryNotifier, LogNotifier, NotificationError, Notifier,
};
pub use ticket::Ticket;
