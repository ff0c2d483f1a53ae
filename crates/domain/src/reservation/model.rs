//! Reservation record.

use chrono::{DateTime, Duration, Utc};
use common::{EventId, ReservationId, UserId, Version};
use serde::{Deserialize, Serialize};

use super::{ReservationError, ReservationStatus};
use crate::event::Event;
use crate::money::Money;

fn price_for(price_per_person: Money, seats: u32) -> Result<Money, ReservationError> {
    price_per_person
        .checked_multiply(seats)
        .ok_or(ReservationError::TotalOutOfRange {
            seats,
            price_per_person,
        })
}

/// Human-facing reservation reference, `RES-` followed by 10 upper-case hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationCode(String);

impl ReservationCode {
    const PREFIX: &'static str = "RES-";
    const RANDOM_LEN: usize = 10;

    /// Generates a fresh code from a random UUID.
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}{}",
            Self::PREFIX,
            hex[..Self::RANDOM_LEN].to_ascii_uppercase()
        ))
    }

    /// Wraps a code loaded from storage.
    pub fn from_string(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the code has the generated shape.
    pub fn is_well_formed(&self) -> bool {
        self.0
            .strip_prefix(Self::PREFIX)
            .is_some_and(|rest| {
                rest.len() == Self::RANDOM_LEN
                    && rest
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
    }
}

impl std::fmt::Display for ReservationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a seat-count edit moves the event inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatDelta {
    /// More seats are needed from the event.
    Increase(u32),
    /// Seats go back to the event.
    Decrease(u32),
    Unchanged,
}

impl SeatDelta {
    fn between(old: u32, new: u32) -> Self {
        match new.cmp(&old) {
            std::cmp::Ordering::Greater => SeatDelta::Increase(new - old),
            std::cmp::Ordering::Less => SeatDelta::Decrease(old - new),
            std::cmp::Ordering::Equal => SeatDelta::Unchanged,
        }
    }
}

/// A user's claim on some number of an event's seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub code: ReservationCode,
    pub user_id: UserId,
    pub event_id: EventId,
    pub number_of_seats: u32,
    pub total_price: Money,
    pub status: ReservationStatus,
    pub is_paid: bool,
    pub notes: String,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: Version,
}

impl Reservation {
    /// Creates a confirmed reservation priced from the event.
    ///
    /// This does not touch the event inventory. Callers reserve the seats.
    pub fn confirmed(
        event: &Event,
        user_id: UserId,
        seats: u32,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ReservationError> {
        if seats == 0 {
            return Err(ReservationError::InvalidSeatCount { seats });
        }
        let total_price = price_for(event.price_per_person, seats)?;

        Ok(Self {
            id: ReservationId::new(),
            code: ReservationCode::generate(),
            user_id,
            event_id: event.id,
            number_of_seats: seats,
            total_price,
            status: ReservationStatus::Confirmed,
            is_paid: false,
            notes: notes.into(),
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        })
    }

    /// Computes how changing to `new_seats` would move the inventory.
    pub fn seat_delta(&self, new_seats: u32) -> Result<SeatDelta, ReservationError> {
        if !self.status.can_update() {
            return Err(ReservationError::InvalidStateTransition {
                current_state: self.status,
                action: "update",
            });
        }
        if new_seats == 0 {
            return Err(ReservationError::InvalidSeatCount { seats: new_seats });
        }
        Ok(SeatDelta::between(self.number_of_seats, new_seats))
    }

    /// Sets the seat count and reprices at `price_per_person`.
    pub fn apply_seat_change(
        &mut self,
        new_seats: u32,
        price_per_person: Money,
        now: DateTime<Utc>,
    ) -> Result<SeatDelta, ReservationError> {
        let delta = self.seat_delta(new_seats)?;
        self.total_price = price_for(price_per_person, new_seats)?;
        self.number_of_seats = new_seats;
        self.updated_at = now;
        Ok(delta)
    }

    pub fn set_notes(&mut self, notes: impl Into<String>, now: DateTime<Utc>) {
        self.notes = notes.into();
        self.updated_at = now;
    }

    /// Cancels the reservation.
    ///
    /// Returns the seats to hand back to the event, or `None` if it was already
    /// cancelled (a repeated cancel changes nothing).
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Option<u32> {
        if !self.status.can_cancel() {
            return None;
        }
        self.status = ReservationStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Some(self.number_of_seats)
    }

    /// True while the reservation is live and the event starts later than
    /// `now + cutoff`.
    pub fn can_be_cancelled(
        &self,
        event_date: DateTime<Utc>,
        now: DateTime<Utc>,
        cutoff: Duration,
    ) -> bool {
        self.status.can_cancel() && event_date - cutoff > now
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) {
        self.is_paid = true;
        self.updated_at = now;
    }

    /// Machine-readable text encoded into the ticket.
    pub fn ticket_payload(&self) -> String {
        format!("TICKET-{}-{}", self.code, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Category, EventStatus, NewEvent};

    fn event(price: i64) -> Event {
        let now = Utc::now();
        let mut event = Event::create(
            NewEvent {
                title: "Food Festival".to_string(),
                description: String::new(),
                category: Category::Gastronomy,
                date: now + Duration::days(10),
                location: "Sousse".to_string(),
                capacity: 50,
                available_seats: None,
                price_per_person: Money::from_units(price),
                status: EventStatus::Pending,
                image_url: None,
            },
            now,
        )
        .unwrap();
        event.transition_to(EventStatus::Confirmed, now).unwrap();
        event
    }

    fn reservation(seats: u32) -> Reservation {
        Reservation::confirmed(&event(20), UserId::new(), seats, "", Utc::now()).unwrap()
    }

    #[test]
    fn generated_code_is_well_formed() {
        let code = ReservationCode::generate();
        assert!(code.as_str().starts_with("RES-"));
        assert_eq!(code.as_str().len(), 14);
        assert!(code.is_well_formed());
        assert_ne!(code, ReservationCode::generate());
    }

    #[test]
    fn foreign_code_is_not_well_formed() {
        assert!(!ReservationCode::from_string("RES-abc").is_well_formed());
        assert!(!ReservationCode::from_string("XYZ-0123456789").is_well_formed());
    }

    #[test]
    fn confirmed_reservation_is_priced_from_event() {
        let event = event(20);
        let r = Reservation::confirmed(&event, UserId::new(), 3, "aisle", Utc::now()).unwrap();
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.event_id, event.id);
        assert_eq!(r.total_price, Money::from_units(60));
        assert_eq!(r.notes, "aisle");
        assert!(!r.is_paid);
        assert!(r.cancelled_at.is_none());
    }

    #[test]
    fn zero_seats_rejected() {
        let result = Reservation::confirmed(&event(20), UserId::new(), 0, "", Utc::now());
        assert_eq!(result, Err(ReservationError::InvalidSeatCount { seats: 0 }));
    }

    #[test]
    fn seat_delta_directions() {
        let r = reservation(2);
        assert_eq!(r.seat_delta(5).unwrap(), SeatDelta::Increase(3));
        assert_eq!(r.seat_delta(1).unwrap(), SeatDelta::Decrease(1));
        assert_eq!(r.seat_delta(2).unwrap(), SeatDelta::Unchanged);
    }

    #[test]
    fn apply_seat_change_reprices() {
        let mut r = reservation(2);
        let delta = r
            .apply_seat_change(5, Money::from_units(20), Utc::now())
            .unwrap();
        assert_eq!(delta, SeatDelta::Increase(3));
        assert_eq!(r.number_of_seats, 5);
        assert_eq!(r.total_price, Money::from_units(100));
    }

    #[test]
    fn cancel_returns_seats_once() {
        let mut r = reservation(4);
        assert_eq!(r.cancel(Utc::now()), Some(4));
        assert_eq!(r.status, ReservationStatus::Cancelled);
        let stamped = r.cancelled_at;
        assert!(stamped.is_some());

        assert_eq!(r.cancel(Utc::now()), None);
        assert_eq!(r.cancelled_at, stamped);
    }

    #[test]
    fn update_after_cancel_is_rejected() {
        let mut r = reservation(4);
        r.cancel(Utc::now());
        let result = r.apply_seat_change(2, Money::from_units(20), Utc::now());
        assert_eq!(
            result,
            Err(ReservationError::InvalidStateTransition {
                current_state: ReservationStatus::Cancelled,
                action: "update",
            })
        );
        assert_eq!(r.number_of_seats, 4);
    }

    #[test]
    fn total_out_of_range_is_an_error() {
        let mut event = event(0);
        event.price_per_person = Event::MAX_PRICE;
        let result = Reservation::confirmed(&event, UserId::new(), u32::MAX, "", Utc::now());
        assert_eq!(
            result,
            Err(ReservationError::TotalOutOfRange {
                seats: u32::MAX,
                price_per_person: Event::MAX_PRICE,
            })
        );

        let mut r = reservation(2);
        let before = r.clone();
        assert!(matches!(
            r.apply_seat_change(u32::MAX, Event::MAX_PRICE, Utc::now()),
            Err(ReservationError::TotalOutOfRange { .. })
        ));
        assert_eq!(r, before);
    }

    #[test]
    fn can_be_cancelled_until_event_starts() {
        let r = reservation(1);
        let now = Utc::now();
        let event_date = now + Duration::hours(2);
        assert!(r.can_be_cancelled(event_date, now, Duration::zero()));
        assert!(!r.can_be_cancelled(now, now, Duration::zero()));
        assert!(!r.can_be_cancelled(now - Duration::hours(1), now, Duration::zero()));
    }

    #[test]
    fn cutoff_narrows_cancellation_window() {
        let r = reservation(1);
        let now = Utc::now();
        let event_date = now + Duration::hours(2);
        assert!(!r.can_be_cancelled(event_date, now, Duration::hours(24)));
        assert!(r.can_be_cancelled(now + Duration::hours(25), now, Duration::hours(24)));
    }

    #[test]
    fn cancelled_reservation_cannot_be_cancelled() {
        let mut r = reservation(1);
        r.cancel(Utc::now());
        assert!(!r.can_be_cancelled(Utc::now() + Duration::days(1), Utc::now(), Duration::zero()));
    }

    #[test]
    fn ticket_payload_embeds_code_and_id() {
        let r = reservation(1);
        assert_eq!(r.ticket_payload(), format!("TICKET-{}-{}", r.code, r.id));
    }
}
