//! Event record and seat inventory operations.

use chrono::{DateTime, Utc};
use common::{EventId, Version};
use serde::{Deserialize, Serialize};

use super::{Category, EventError, EventStatus};
use crate::money::Money;

/// A bookable occurrence with a fixed date, venue, capacity and price per seat.
///
/// `available_seats` is the live remaining-capacity counter. It always stays
/// within `0..=capacity`: [`Event::reserve`] refuses to go below zero and
/// [`Event::release`] refuses to go above capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub date: DateTime<Utc>,
    pub location: String,
    pub capacity: u32,
    pub available_seats: u32,
    pub price_per_person: Money,
    pub status: EventStatus,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: Version,
}

/// Staff input for creating an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub date: DateTime<Utc>,
    pub location: String,
    pub capacity: u32,
    /// Leave unset to open every seat.
    #[serde(default)]
    pub available_seats: Option<u32>,
    pub price_per_person: Money,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial staff edit of an existing event. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub price_per_person: Option<Money>,
    pub image_url: Option<Option<String>>,
}

/// Why an event currently refuses reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum NotBookableReason {
    NotConfirmed { status: EventStatus },
    SoldOut,
    AlreadyStarted,
}

impl std::fmt::Display for NotBookableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotBookableReason::NotConfirmed { status } => {
                write!(f, "event is {status}, not confirmed")
            }
            NotBookableReason::SoldOut => f.write_str("event is sold out"),
            NotBookableReason::AlreadyStarted => f.write_str("event has already started"),
        }
    }
}

impl Event {
    /// Highest ticket price accepted, 99 999 999.99.
    pub const MAX_PRICE: Money = Money::from_cents(9_999_999_999);

    fn is_valid_price(price: Money) -> bool {
        !price.is_negative() && price <= Self::MAX_PRICE
    }

    /// Builds an event from staff input and initializes its inventory.
    ///
    /// When `available_seats` is unset it starts at `capacity`.
    pub fn create(input: NewEvent, now: DateTime<Utc>) -> Result<Self, EventError> {
        if input.title.trim().is_empty() {
            return Err(EventError::TitleRequired);
        }
        if input.capacity == 0 {
            return Err(EventError::InvalidCapacity {
                capacity: input.capacity,
            });
        }
        if !Self::is_valid_price(input.price_per_person) {
            return Err(EventError::InvalidPrice {
                cents: input.price_per_person.cents(),
            });
        }
        if !input.status.is_initial() {
            return Err(EventError::InvalidInitialStatus {
                status: input.status,
            });
        }

        let available_seats = input.available_seats.unwrap_or(input.capacity);
        if available_seats > input.capacity {
            return Err(EventError::AvailabilityExceedsCapacity {
                available: available_seats,
                capacity: input.capacity,
            });
        }

        Ok(Self {
            id: EventId::new(),
            title: input.title,
            description: input.description,
            category: input.category,
            date: input.date,
            location: input.location,
            capacity: input.capacity,
            available_seats,
            price_per_person: input.price_per_person,
            status: input.status,
            image_url: input.image_url,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        })
    }

    /// Returns true iff the event is confirmed, has seats left and has not started.
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.not_bookable_reason(now).is_none()
    }

    /// Explains why [`Event::is_bookable`] is false, if it is.
    pub fn not_bookable_reason(&self, now: DateTime<Utc>) -> Option<NotBookableReason> {
        if self.status != EventStatus::Confirmed {
            Some(NotBookableReason::NotConfirmed {
                status: self.status,
            })
        } else if self.available_seats == 0 {
            Some(NotBookableReason::SoldOut)
        } else if self.date <= now {
            Some(NotBookableReason::AlreadyStarted)
        } else {
            None
        }
    }

    /// Takes `seats` out of the inventory.
    pub fn reserve(&mut self, seats: u32) -> Result<(), EventError> {
        if seats == 0 {
            return Err(EventError::InvalidSeatCount { seats });
        }
        if self.available_seats < seats {
            return Err(EventError::InsufficientSeats {
                requested: seats,
                available: self.available_seats,
            });
        }
        self.available_seats -= seats;
        Ok(())
    }

    /// Returns `seats` to the inventory, never exceeding capacity.
    ///
    /// Returns the number of seats actually put back.
    pub fn release(&mut self, seats: u32) -> u32 {
        let restored = self
            .available_seats
            .saturating_add(seats)
            .min(self.capacity);
        let released = restored - self.available_seats;
        if released < seats {
            tracing::warn!(
                event_id = %self.id,
                requested = seats,
                released,
                capacity = self.capacity,
                "seat release clamped at capacity"
            );
        }
        self.available_seats = restored;
        released
    }

    /// Number of seats currently held by reservations.
    pub fn registered_count(&self) -> u32 {
        self.capacity - self.available_seats
    }

    /// Moves the event along its status lifecycle.
    pub fn transition_to(
        &mut self,
        next: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<(), EventError> {
        if !self.status.can_transition_to(next) {
            return Err(EventError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Applies a staff edit.
    ///
    /// A capacity change shifts `available_seats` by the same amount so the
    /// registered count is preserved.
    pub fn apply_update(&mut self, update: EventUpdate, now: DateTime<Utc>) -> Result<(), EventError> {
        if self.status.is_terminal() {
            return Err(EventError::Closed {
                status: self.status,
            });
        }

        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(EventError::TitleRequired);
        }
        if let Some(price) = update
            .price_per_person
            .filter(|p| !Self::is_valid_price(*p))
        {
            return Err(EventError::InvalidPrice {
                cents: price.cents(),
            });
        }
        if let Some(capacity) = update.capacity {
            if capacity == 0 {
                return Err(EventError::InvalidCapacity { capacity });
            }
            let registered = self.registered_count();
            if capacity < registered {
                return Err(EventError::CapacityBelowRegistered {
                    capacity,
                    registered,
                });
            }
            self.capacity = capacity;
            self.available_seats = capacity - registered;
        }

        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(price) = update.price_per_person {
            self.price_per_person = price;
        }
        if let Some(image_url) = update.image_url {
            self.image_url = image_url;
        }
        self.updated_at = now;
        Ok(())
    }
}
