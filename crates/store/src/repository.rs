use async_trait::async_trait;
use common::{EventId, InvoiceId, PaymentId, ReservationId};
use domain::{Event, Invoice, Money, Payment, Reservation, ReservationCode};

use crate::{EventQuery, ReservationQuery, Result, StoreError};

/// Storage for events and their seat counters.
///
/// Every write bumps the event's version, including seat changes, so a staff
/// edit based on a stale read fails with `ConcurrencyConflict` instead of
/// overwriting seats taken in the meantime.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Stores a new event. Returns it at version 1.
    async fn insert_event(&self, event: &Event) -> Result<Event>;

    async fn get_event(&self, id: EventId) -> Result<Option<Event>>;

    async fn list_events(&self, query: EventQuery) -> Result<Vec<Event>>;

    /// Overwrites an event if its stored version still equals `event.version`.
    async fn update_event(&self, event: &Event) -> Result<Event>;

    /// Takes `seats` from the event in one conditional step.
    ///
    /// Fails with `InsufficientSeats` and changes nothing when fewer seats
    /// are available.
    async fn reserve_seats(&self, id: EventId, seats: u32) -> Result<Event>;

    /// Returns `seats` to the event, never exceeding its capacity.
    async fn release_seats(&self, id: EventId, seats: u32) -> Result<Event>;
}

/// Storage for reservations.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Stores a new reservation. Fails with `Duplicate` if the code is taken.
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<Reservation>;

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;

    async fn find_reservation_by_code(&self, code: &ReservationCode)
    -> Result<Option<Reservation>>;

    async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<Reservation>>;

    /// Overwrites a reservation if its stored version still equals
    /// `reservation.version`.
    async fn update_reservation(&self, reservation: &Reservation) -> Result<Reservation>;
}

/// Storage for invoices, payments and invoice numbering.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    /// Allocates the next invoice sequence number for `year`, starting at 1.
    async fn next_invoice_sequence(&self, year: i32) -> Result<u32>;

    /// Stores a new invoice. Fails with `Duplicate` if the reservation already
    /// has one or the number is taken.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()>;

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>>;

    async fn find_invoice_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Invoice>>;

    async fn update_invoice(&self, invoice: &Invoice) -> Result<()>;

    async fn insert_payment(&self, payment: &Payment) -> Result<()>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;

    /// Payments for a reservation, oldest first.
    async fn list_payments(&self, reservation_id: ReservationId) -> Result<Vec<Payment>>;

    async fn update_payment(&self, payment: &Payment) -> Result<()>;
}

/// Everything the booking services persist.
pub trait BookingStore: EventRepository + ReservationRepository + BillingRepository {}

impl<T> BookingStore for T where T: EventRepository + ReservationRepository + BillingRepository {}

/// Convenience lookups shared by every store.
#[async_trait]
pub trait BookingStoreExt: BookingStore {
    /// Loads an event or fails with `NotFound`.
    async fn require_event(&self, id: EventId) -> Result<Event> {
        self.get_event(id)
            .await?
            .ok_or_else(|| StoreError::not_found("event", id))
    }

    /// Loads a reservation or fails with `NotFound`.
    async fn require_reservation(&self, id: ReservationId) -> Result<Reservation> {
        self.get_reservation(id)
            .await?
            .ok_or_else(|| StoreError::not_found("reservation", id))
    }

    async fn require_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        self.get_invoice(id)
            .await?
            .ok_or_else(|| StoreError::not_found("invoice", id))
    }

    async fn require_payment(&self, id: PaymentId) -> Result<Payment> {
        self.get_payment(id)
            .await?
            .ok_or_else(|| StoreError::not_found("payment", id))
    }

    /// Sum of completed payments recorded against a reservation.
    async fn paid_total(&self, reservation_id: ReservationId) -> Result<Money> {
        Ok(self
            .list_payments(reservation_id)
            .await?
            .iter()
            .filter(|p| p.status.counts_as_paid())
            .map(|p| p.amount)
            .sum())
    }
}

impl<T: BookingStore + ?Sized> BookingStoreExt for T {}
