//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need Docker, so they are
//! ignored by default. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{UserId, Version};
use domain::{
    Category, Event, EventStatus, Invoice, InvoiceNumber, Money, NewEvent, Payment, PaymentMethod,
    Reservation, ReservationStatus, TaxRate,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    BillingRepository, BookingStoreExt, EventQuery, EventRepository, PostgresStore,
    ReservationQuery, ReservationRepository, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh store with its own pool and empty tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE payments, invoices, reservations, events, invoice_sequences")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn confirmed_event(capacity: u32) -> Event {
    let now = Utc::now();
    let mut event = Event::create(
        NewEvent {
            title: "Film Night".to_string(),
            description: "Classics".to_string(),
            category: Category::Culture,
            date: now + Duration::days(5),
            location: "Bizerte".to_string(),
            capacity,
            available_seats: None,
            price_per_person: Money::from_cents(1250),
            status: EventStatus::Pending,
            image_url: Some("https://cdn.cinema.test/film.png".to_string()),
        },
        now,
    )
    .unwrap();
    event.transition_to(EventStatus::Confirmed, now).unwrap();
    event
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn insert_and_load_event() {
    let store = get_test_store().await;
    let event = confirmed_event(40);

    let stored = store.insert_event(&event).await.unwrap();
    assert_eq!(stored.version, Version::first());

    let loaded = store.require_event(event.id).await.unwrap();
    assert_eq!(loaded.title, "Film Night");
    assert_eq!(loaded.category, Category::Culture);
    assert_eq!(loaded.status, EventStatus::Confirmed);
    assert_eq!(loaded.capacity, 40);
    assert_eq!(loaded.available_seats, 40);
    assert_eq!(loaded.price_per_person, Money::from_cents(1250));
    assert_eq!(loaded.image_url.as_deref(), Some("https://cdn.cinema.test/film.png"));
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn conditional_reserve_and_clamped_release() {
    let store = get_test_store().await;
    let event = store.insert_event(&confirmed_event(5)).await.unwrap();

    let after = store.reserve_seats(event.id, 5).await.unwrap();
    assert_eq!(after.available_seats, 0);
    assert_eq!(after.version, Version::new(2));

    let result = store.reserve_seats(event.id, 1).await;
    assert!(matches!(
        result,
        Err(StoreError::InsufficientSeats { available: 0, .. })
    ));

    let released = store.release_seats(event.id, 8).await.unwrap();
    assert_eq!(released.available_seats, 5);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn concurrent_reserves_never_oversell() {
    let store = get_test_store().await;
    let event = store.insert_event(&confirmed_event(20)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..40 {
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

    assert_eq!(granted, 20);
    let event = store.require_event(event.id).await.unwrap();
    assert_eq!(event.available_seats, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn stale_event_update_conflicts() {
    let store = get_test_store().await;
    let event = store.insert_event(&confirmed_event(10)).await.unwrap();
    store.reserve_seats(event.id, 2).await.unwrap();

    let mut stale = event.clone();
    stale.title = "Changed".to_string();
    let result = store.update_event(&stale).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict {
            expected,
            actual,
            ..
        }) if expected == Version::first() && actual == Version::new(2)
    ));
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn reservation_round_trip_and_listing() {
    let store = get_test_store().await;
    let event = store.insert_event(&confirmed_event(10)).await.unwrap();
    let user = UserId::new();

    let reservation =
        Reservation::confirmed(&event, user, 3, "front row", Utc::now()).unwrap();
    let stored = store.insert_reservation(&reservation).await.unwrap();
    assert_eq!(stored.version, Version::first());
    assert_eq!(stored.total_price, Money::from_cents(3750));

    let by_code = store
        .find_reservation_by_code(&reservation.code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_code.id, reservation.id);

    let mut cancelled = stored.clone();
    cancelled.cancel(Utc::now());
    let saved = store.update_reservation(&cancelled).await.unwrap();
    assert_eq!(saved.status, ReservationStatus::Cancelled);
    assert!(saved.cancelled_at.is_some());

    let mut late = stored.clone();
    late.cancel(Utc::now());
    assert!(matches!(
        store.update_reservation(&late).await,
        Err(StoreError::ConcurrencyConflict { .. })
    ));

    let active = store
        .list_reservations(ReservationQuery::for_user(user).active())
        .await
        .unwrap();
    assert!(active.is_empty());
    let all = store
        .list_reservations(ReservationQuery::for_user(user))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn billing_records() {
    let store = get_test_store().await;
    let event = store.insert_event(&confirmed_event(10)).await.unwrap();
    let reservation = store
        .insert_reservation(
            &Reservation::confirmed(&event, UserId::new(), 2, "", Utc::now()).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(store.next_invoice_sequence(2026).await.unwrap(), 1);
    assert_eq!(store.next_invoice_sequence(2026).await.unwrap(), 2);
    assert_eq!(store.next_invoice_sequence(2027).await.unwrap(), 1);

    let now = Utc::now();
    let invoice = Invoice::issue_for(
        &reservation,
        InvoiceNumber::format(2026, 3),
        TaxRate::STANDARD,
        Some(Duration::days(15)),
        now,
    )
    .unwrap();
    store.insert_invoice(&invoice).await.unwrap();

    let duplicate = Invoice::issue_for(
        &reservation,
        InvoiceNumber::format(2026, 4),
        TaxRate::STANDARD,
        None,
        now,
    )
    .unwrap();
    assert!(matches!(
        store.insert_invoice(&duplicate).await,
        Err(StoreError::Duplicate { .. })
    ));

    let mut payment = Payment::new(
        reservation.id,
        Some(invoice.id),
        reservation.user_id,
        invoice.total,
        PaymentMethod::Mobile,
        now,
    )
    .unwrap();
    store.insert_payment(&payment).await.unwrap();
    assert!(store.paid_total(reservation.id).await.unwrap().is_zero());

    payment.complete(now).unwrap();
    store.update_payment(&payment).await.unwrap();
    assert_eq!(store.paid_total(reservation.id).await.unwrap(), invoice.total);

    let loaded = store
        .find_invoice_for_reservation(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.number, invoice.number);
    assert_eq!(loaded.total, invoice.total);
    assert_eq!(loaded.tax_rate, TaxRate::STANDARD);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn list_events_by_filters() {
    let store = get_test_store().await;
    let now = Utc::now();

    let upcoming = confirmed_event(10);
    let mut pending = confirmed_event(10);
    pending.status = EventStatus::Pending;
    let mut past = confirmed_event(10);
    past.date = now - Duration::days(2);

    for e in [&upcoming, &pending, &past] {
        store.insert_event(e).await.unwrap();
    }

    let listed = store.list_events(EventQuery::upcoming(now)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, upcoming.id);

    let culture = store
        .list_events(EventQuery::new().category(Category::Culture).limit(2))
        .await
        .unwrap();
    assert_eq!(culture.len(), 2);
}
