//! Integration tests for seat inventory driven by reservation lifecycles.
//!
//! These tests move seats between an event and its reservations the way the
//! booking flows do, without any storage.

use chrono::{Duration, Utc};
use common::UserId;
use domain::{
    Category, Event, EventError, EventStatus, Money, NewEvent, Reservation, ReservationStatus,
    SeatDelta,
};

fn bookable_event(capacity: u32) -> Event {
    let now = Utc::now();
    let mut event = Event::create(
        NewEvent {
            title: "Summer Concert".to_string(),
            description: "Open air".to_string(),
            category: Category::Music,
            date: now + Duration::days(14),
            location: "Hammamet".to_string(),
            capacity,
            available_seats: None,
            price_per_person: Money::from_units(30),
            status: EventStatus::Pending,
            image_url: None,
        },
        now,
    )
    .unwrap();
    event.transition_to(EventStatus::Confirmed, now).unwrap();
    event
}

fn book(event: &mut Event, seats: u32) -> Result<Reservation, EventError> {
    event.reserve(seats)?;
    Ok(Reservation::confirmed(event, UserId::new(), seats, "", Utc::now()).unwrap())
}

fn change_seats(event: &mut Event, reservation: &mut Reservation, seats: u32) -> Result<(), EventError> {
    match reservation.seat_delta(seats).unwrap() {
        SeatDelta::Increase(n) => event.reserve(n)?,
        SeatDelta::Decrease(n) => {
            event.release(n);
        }
        SeatDelta::Unchanged => {}
    }
    reservation
        .apply_seat_change(seats, event.price_per_person, Utc::now())
        .unwrap();
    Ok(())
}

fn assert_inventory_bounds(event: &Event) {
    assert!(event.available_seats <= event.capacity);
}

mod reservation_flow {
    use super::*;

    #[test]
    fn scenario_from_booking_to_cancellation() {
        let mut event = bookable_event(100);

        let mut a = book(&mut event, 30).unwrap();
        assert_eq!(event.available_seats, 70);

        let rejected = book(&mut event, 80);
        assert!(matches!(rejected, Err(EventError::InsufficientSeats { .. })));
        assert_eq!(event.available_seats, 70);

        let seats = a.cancel(Utc::now()).unwrap();
        event.release(seats);
        assert_eq!(event.available_seats, 100);
        assert_eq!(a.status, ReservationStatus::Cancelled);
    }

    #[test]
    fn update_within_availability() {
        let mut event = bookable_event(5);
        let mut r = book(&mut event, 2).unwrap();
        assert_eq!(event.available_seats, 3);

        change_seats(&mut event, &mut r, 5).unwrap();
        assert_eq!(event.available_seats, 0);
        assert_eq!(r.total_price, Money::from_units(150));
    }

    #[test]
    fn update_beyond_availability_changes_nothing() {
        let mut event = bookable_event(5);
        let mut r = book(&mut event, 2).unwrap();

        let result = change_seats(&mut event, &mut r, 10);
        assert!(result.is_err());
        assert_eq!(event.available_seats, 3);
        assert_eq!(r.number_of_seats, 2);
    }

    #[test]
    fn repeated_cancel_releases_once() {
        let mut event = bookable_event(10);
        let mut r = book(&mut event, 4).unwrap();

        for _ in 0..3 {
            if let Some(seats) = r.cancel(Utc::now()) {
                event.release(seats);
            }
        }
        assert_eq!(event.available_seats, 10);
    }
}

mod invariants {
    use super::*;

    #[test]
    fn bounds_hold_over_mixed_sequence() {
        let mut event = bookable_event(20);
        let mut held = Vec::new();

        for seats in [3, 5, 7, 9, 2, 4] {
            if let Ok(r) = book(&mut event, seats) {
                held.push(r);
            }
            assert_inventory_bounds(&event);
        }

        for (i, r) in held.iter_mut().enumerate() {
            let target = if i % 2 == 0 { r.number_of_seats + 1 } else { 1 };
            let _ = change_seats(&mut event, r, target);
            assert_inventory_bounds(&event);
        }

        let registered: u32 = held
            .iter()
            .filter(|r| r.status.is_active())
            .map(|r| r.number_of_seats)
            .sum();
        assert_eq!(event.registered_count(), registered);

        for r in held.iter_mut() {
            if let Some(seats) = r.cancel(Utc::now()) {
                event.release(seats);
            }
            assert_inventory_bounds(&event);
        }
        assert_eq!(event.available_seats, event.capacity);
    }

    #[test]
    fn stray_release_never_exceeds_capacity() {
        let mut event = bookable_event(8);
        book(&mut event, 3).unwrap();
        event.release(3);
        event.release(3);
        assert_eq!(event.available_seats, 8);
    }
}
