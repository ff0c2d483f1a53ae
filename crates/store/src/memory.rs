use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{EventId, InvoiceId, PaymentId, ReservationId};
use domain::{Event, EventError, Invoice, Payment, Reservation, ReservationCode};
use tokio::sync::RwLock;

use crate::{
    EventQuery, ReservationQuery, Result, StoreError,
    repository::{BillingRepository, EventRepository, ReservationRepository},
};

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    reservations: HashMap<ReservationId, Reservation>,
    invoices: HashMap<InvoiceId, Invoice>,
    payments: HashMap<PaymentId, Payment>,
    invoice_sequences: HashMap<i32, u32>,
}

#[derive(Debug, Default)]
struct Failures {
    insert_reservation: AtomicBool,
    update_reservation: AtomicBool,
    insert_invoice: AtomicBool,
}

/// In-memory booking store.
///
/// All tables sit behind one lock, so every operation is atomic with respect
/// to the others. Failure switches let tests exercise the compensation paths
/// of the booking services.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    failures: Arc<Failures>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `insert_reservation` call fail until reset.
    pub fn set_fail_on_insert_reservation(&self, fail: bool) {
        self.failures
            .insert_reservation
            .store(fail, Ordering::SeqCst);
    }

    /// Makes every `update_reservation` call fail until reset.
    pub fn set_fail_on_update_reservation(&self, fail: bool) {
        self.failures
            .update_reservation
            .store(fail, Ordering::SeqCst);
    }

    /// Makes every `insert_invoice` call fail until reset.
    pub fn set_fail_on_insert_invoice(&self, fail: bool) {
        self.failures.insert_invoice.store(fail, Ordering::SeqCst);
    }

    pub async fn event_count(&self) -> usize {
        self.tables.read().await.events.len()
    }

    pub async fn reservation_count(&self) -> usize {
        self.tables.read().await.reservations.len()
    }

    pub async fn invoice_count(&self) -> usize {
        self.tables.read().await.invoices.len()
    }

    fn injected(flag: &AtomicBool, what: &'static str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Injected(what));
        }
        Ok(())
    }
}

fn page<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<Event> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(StoreError::Duplicate {
                entity: "event",
                key: event.id.to_string(),
            });
        }
        let mut stored = event.clone();
        stored.version = common::Version::first();
        tables.events.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self, query: EventQuery) -> Result<Vec<Event>> {
        let tables = self.tables.read().await;
        let mut events: Vec<_> = tables
            .events
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date, e.id));
        Ok(page(events, query.offset, query.limit))
    }

    async fn update_event(&self, event: &Event) -> Result<Event> {
        let mut tables = self.tables.write().await;
        let current = tables
            .events
            .get(&event.id)
            .ok_or_else(|| StoreError::not_found("event", event.id))?;
        if current.version != event.version {
            return Err(StoreError::ConcurrencyConflict {
                entity: "event",
                id: event.id.as_uuid(),
                expected: event.version,
                actual: current.version,
            });
        }
        let mut stored = event.clone();
        stored.version = event.version.next();
        tables.events.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn reserve_seats(&self, id: EventId, seats: u32) -> Result<Event> {
        let mut tables = self.tables.write().await;
        let event = tables
            .events
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("event", id))?;
        event.reserve(seats).map_err(|err| match err {
            EventError::InsufficientSeats {
                requested,
                available,
            } => StoreError::InsufficientSeats {
                event_id: id,
                requested,
                available,
            },
            other => StoreError::InvalidData(other.to_string()),
        })?;
        event.version = event.version.next();
        Ok(event.clone())
    }

    async fn release_seats(&self, id: EventId, seats: u32) -> Result<Event> {
        let mut tables = self.tables.write().await;
        let event = tables
            .events
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("event", id))?;
        event.release(seats);
        event.version = event.version.next();
        Ok(event.clone())
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<Reservation> {
        Self::injected(&self.failures.insert_reservation, "insert_reservation")?;

        let mut tables = self.tables.write().await;
        if tables
            .reservations
            .values()
            .any(|r| r.code == reservation.code || r.id == reservation.id)
        {
            return Err(StoreError::Duplicate {
                entity: "reservation",
                key: reservation.code.to_string(),
            });
        }
        let mut stored = reservation.clone();
        stored.version = common::Version::first();
        tables.reservations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.tables.read().await.reservations.get(&id).cloned())
    }

    async fn find_reservation_by_code(
        &self,
        code: &ReservationCode,
    ) -> Result<Option<Reservation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reservations
            .values()
            .find(|r| &r.code == code)
            .cloned())
    }

    async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        let tables = self.tables.read().await;
        let mut reservations: Vec<_> = tables
            .reservations
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(page(reservations, query.offset, query.limit))
    }

    async fn update_reservation(&self, reservation: &Reservation) -> Result<Reservation> {
        Self::injected(&self.failures.update_reservation, "update_reservation")?;

        let mut tables = self.tables.write().await;
        let current = tables
            .reservations
            .get(&reservation.id)
            .ok_or_else(|| StoreError::not_found("reservation", reservation.id))?;
        if current.version != reservation.version {
            return Err(StoreError::ConcurrencyConflict {
                entity: "reservation",
                id: reservation.id.as_uuid(),
                expected: reservation.version,
                actual: current.version,
            });
        }
        let mut stored = reservation.clone();
        stored.version = reservation.version.next();
        tables.reservations.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl BillingRepository for InMemoryStore {
    async fn next_invoice_sequence(&self, year: i32) -> Result<u32> {
        let mut tables = self.tables.write().await;
        let counter = tables.invoice_sequences.entry(year).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        Self::injected(&self.failures.insert_invoice, "insert_invoice")?;

        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.invoices.values().find(|i| {
            i.reservation_id == invoice.reservation_id || i.number == invoice.number
        }) {
            let key = if existing.number == invoice.number {
                invoice.number.to_string()
            } else {
                invoice.reservation_id.to_string()
            };
            return Err(StoreError::Duplicate {
                entity: "invoice",
                key,
            });
        }
        tables.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        Ok(self.tables.read().await.invoices.get(&id).cloned())
    }

    async fn find_invoice_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Invoice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .invoices
            .values()
            .find(|i| i.reservation_id == reservation_id)
            .cloned())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.invoices.get_mut(&invoice.id) {
            Some(slot) => {
                *slot = invoice.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("invoice", invoice.id)),
        }
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .payments
            .values()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(StoreError::Duplicate {
                entity: "payment",
                key: payment.transaction_id.to_string(),
            });
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.tables.read().await.payments.get(&id).cloned())
    }

    async fn list_payments(&self, reservation_id: ReservationId) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<_> = tables
            .payments
            .values()
            .filter(|p| p.reservation_id == reservation_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.created_at, p.id));
        Ok(payments)
    }

    async fn update_payment(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.payments.get_mut(&payment.id) {
            Some(slot) => {
                *slot = payment.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("payment", payment.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BookingStoreExt;
    use chrono::{Duration, Utc};
    use common::{UserId, Version};
    use domain::{
        Category, EventStatus, InvoiceNumber, Money, NewEvent, PaymentMethod, ReservationStatus,
        TaxRate,
    };

    fn confirmed_event(capacity: u32) -> Event {
        let now = Utc::now();
        let mut event = Event::create(
            NewEvent {
                title: "Marathon".to_string(),
                description: String::new(),
                category: Category::Sport,
                date: now + Duration::days(7),
                location: "Monastir".to_string(),
                capacity,
                available_seats: None,
                price_per_person: Money::from_units(15),
                status: EventStatus::Pending,
                image_url: None,
            },
            now,
        )
        .unwrap();
        event.transition_to(EventStatus::Confirmed, now).unwrap();
        event
    }

    async fn stored_event(store: &InMemoryStore, capacity: u32) -> Event {
        store
            .insert_event(&confirmed_event(capacity))
            .await
            .unwrap()
    }

    fn reservation_for(event: &Event, seats: u32) -> Reservation {
        Reservation::confirmed(event, UserId::new(), seats, "", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn insert_event_starts_at_first_version() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;
        assert_eq!(event.version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn reserve_seats_decrements_and_bumps_version() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;

        let updated = store.reserve_seats(event.id, 4).await.unwrap();
        assert_eq!(updated.available_seats, 6);
        assert_eq!(updated.version, Version::new(2));
    }

    #[tokio::test]
    async fn reserve_seats_refuses_to_oversell() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 3).await;

        let result = store.reserve_seats(event.id, 4).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientSeats {
                requested: 4,
                available: 3,
                ..
            })
        ));
        let unchanged = store.require_event(event.id).await.unwrap();
        assert_eq!(unchanged.available_seats, 3);
        assert_eq!(unchanged.version, Version::first());
    }

    #[tokio::test]
    async fn release_seats_is_clamped() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 5).await;
        store.reserve_seats(event.id, 2).await.unwrap();

        let released = store.release_seats(event.id, 9).await.unwrap();
        assert_eq!(released.available_seats, 5);
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversell() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 50).await;

        let mut handles = Vec::new();
        for _ in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.reserve_seats(event.id, 1).await },
            ));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        assert_eq!(granted, 50);
        let event = store.require_event(event.id).await.unwrap();
        assert_eq!(event.available_seats, 0);
    }

    #[tokio::test]
    async fn stale_event_update_conflicts() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;
        store.reserve_seats(event.id, 1).await.unwrap();

        let mut stale = event.clone();
        stale.title = "Renamed".to_string();
        let result = store.update_event(&stale).await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict {
                entity: "event",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn reservation_versioning() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;
        let stored = store
            .insert_reservation(&reservation_for(&event, 2))
            .await
            .unwrap();
        assert_eq!(stored.version, Version::first());

        let mut first = stored.clone();
        first.cancel(Utc::now());
        let saved = store.update_reservation(&first).await.unwrap();
        assert_eq!(saved.version, Version::new(2));

        let mut second = stored.clone();
        second.cancel(Utc::now());
        assert!(matches!(
            store.update_reservation(&second).await,
            Err(StoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_reservation_code_rejected() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;
        let reservation = reservation_for(&event, 1);
        store.insert_reservation(&reservation).await.unwrap();

        let mut clash = reservation_for(&event, 1);
        clash.code = reservation.code.clone();
        assert!(matches!(
            store.insert_reservation(&clash).await,
            Err(StoreError::Duplicate { .. })
        ));
        let found = store
            .find_reservation_by_code(&reservation.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, reservation.id);
    }

    #[tokio::test]
    async fn list_reservations_filters_by_user_and_status() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;
        let user = UserId::new();

        let mut mine = reservation_for(&event, 1);
        mine.user_id = user;
        let mine = store.insert_reservation(&mine).await.unwrap();
        store
            .insert_reservation(&reservation_for(&event, 1))
            .await
            .unwrap();

        let mut cancelled = mine.clone();
        cancelled.cancel(Utc::now());
        store.update_reservation(&cancelled).await.unwrap();

        let all_mine = store
            .list_reservations(ReservationQuery::for_user(user))
            .await
            .unwrap();
        assert_eq!(all_mine.len(), 1);

        let active = store
            .list_reservations(ReservationQuery::for_user(user).active())
            .await
            .unwrap();
        assert!(active.is_empty());

        let for_event = store
            .list_reservations(
                ReservationQuery::for_event(event.id).status(ReservationStatus::Confirmed),
            )
            .await
            .unwrap();
        assert_eq!(for_event.len(), 1);
    }

    #[tokio::test]
    async fn list_events_filters_and_orders() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let mut later = confirmed_event(10);
        later.date = now + Duration::days(20);
        let mut sooner = confirmed_event(10);
        sooner.date = now + Duration::days(2);
        let mut past = confirmed_event(10);
        past.date = now - Duration::days(1);
        let mut gastronomy = confirmed_event(10);
        gastronomy.category = Category::Gastronomy;

        for e in [&later, &sooner, &past, &gastronomy] {
            store.insert_event(e).await.unwrap();
        }

        let upcoming = store.list_events(EventQuery::upcoming(now)).await.unwrap();
        assert_eq!(upcoming.len(), 3);
        assert_eq!(upcoming[0].id, sooner.id);

        let food = store
            .list_events(EventQuery::new().category(Category::Gastronomy))
            .await
            .unwrap();
        assert_eq!(food.len(), 1);

        let paged = store
            .list_events(EventQuery::new().offset(1).limit(2))
            .await
            .unwrap();
        assert_eq!(paged.len(), 2);
    }

    #[tokio::test]
    async fn invoice_sequence_is_per_year() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_invoice_sequence(2026).await.unwrap(), 1);
        assert_eq!(store.next_invoice_sequence(2026).await.unwrap(), 2);
        assert_eq!(store.next_invoice_sequence(2027).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn one_invoice_per_reservation() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;
        let reservation = reservation_for(&event, 2);
        let now = Utc::now();

        let first = Invoice::issue_for(
            &reservation,
            InvoiceNumber::format(2026, 1),
            TaxRate::STANDARD,
            None,
            now,
        )
        .unwrap();
        store.insert_invoice(&first).await.unwrap();

        let second = Invoice::issue_for(
            &reservation,
            InvoiceNumber::format(2026, 2),
            TaxRate::STANDARD,
            None,
            now,
        )
        .unwrap();
        assert!(matches!(
            store.insert_invoice(&second).await,
            Err(StoreError::Duplicate {
                entity: "invoice",
                ..
            })
        ));

        let found = store
            .find_invoice_for_reservation(reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn paid_total_counts_completed_payments_only() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;
        let reservation = reservation_for(&event, 2);
        let now = Utc::now();

        let mut done = Payment::new(
            reservation.id,
            None,
            reservation.user_id,
            Money::from_units(10),
            PaymentMethod::Cash,
            now,
        )
        .unwrap();
        done.complete(now).unwrap();
        let pending = Payment::new(
            reservation.id,
            None,
            reservation.user_id,
            Money::from_units(7),
            PaymentMethod::Card,
            now,
        )
        .unwrap();

        store.insert_payment(&done).await.unwrap();
        store.insert_payment(&pending).await.unwrap();

        assert_eq!(
            store.paid_total(reservation.id).await.unwrap(),
            Money::from_units(10)
        );
        assert_eq!(store.list_payments(reservation.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = InMemoryStore::new();
        let event = stored_event(&store, 10).await;

        store.set_fail_on_insert_reservation(true);
        assert!(matches!(
            store.insert_reservation(&reservation_for(&event, 1)).await,
            Err(StoreError::Injected("insert_reservation"))
        ));
        assert_eq!(store.reservation_count().await, 0);

        store.set_fail_on_insert_reservation(false);
        assert!(
            store
                .insert_reservation(&reservation_for(&event, 1))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.require_event(EventId::new()).await,
            Err(StoreError::NotFound { entity: "event", .. })
        ));
        assert!(matches!(
            store.release_seats(EventId::new(), 1).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.require_reservation(ReservationId::new()).await,
            Err(StoreError::NotFound {
                entity: "reservation",
                ..
            })
        ));
    }
}
