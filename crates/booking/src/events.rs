//! Staff-facing event catalog.

use chrono::Utc;
use common::EventId;
use domain::{Event, EventStatus, EventUpdate, NewEvent, NotBookableReason};
use serde::Serialize;
use store::{BookingStore, BookingStoreExt, EventQuery};

use crate::error::Result;

/// An event together with its derived booking figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub registered_count: u32,
    pub is_bookable: bool,
    pub not_bookable_reason: Option<NotBookableReason>,
}

impl From<Event> for EventDetails {
    fn from(event: Event) -> Self {
        let reason = event.not_bookable_reason(Utc::now());
        Self {
            registered_count: event.registered_count(),
            is_bookable: reason.is_none(),
            not_bookable_reason: reason,
            event,
        }
    }
}

/// Creates, edits and publishes events.
#[derive(Clone)]
pub struct EventCatalog<S> {
    store: S,
}

impl<S: BookingStore> EventCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an event in draft or pending status with every seat open
    /// unless availability is given.
    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_event(&self, input: NewEvent) -> Result<Event> {
        let event = Event::create(input, Utc::now())?;
        let stored = self.store.insert_event(&event).await?;
        tracing::info!(event_id = %stored.id, capacity = stored.capacity, "event created");
        Ok(stored)
    }

    /// Applies a staff edit. A capacity change keeps the registered count.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_event(&self, id: EventId, update: EventUpdate) -> Result<Event> {
        let mut event = self.store.require_event(id).await?;
        event.apply_update(update, Utc::now())?;
        let stored = self.store.update_event(&event).await?;
        tracing::info!(
            event_id = %id,
            capacity = stored.capacity,
            available_seats = stored.available_seats,
            "event updated"
        );
        Ok(stored)
    }

    /// Moves the event along its status lifecycle.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(&self, id: EventId, status: EventStatus) -> Result<Event> {
        let mut event = self.store.require_event(id).await?;
        let from = event.status;
        event.transition_to(status, Utc::now())?;
        let stored = self.store.update_event(&event).await?;
        tracing::info!(event_id = %id, %from, to = %status, "event status changed");
        Ok(stored)
    }

    pub async fn get_event(&self, id: EventId) -> Result<EventDetails> {
        Ok(self.store.require_event(id).await?.into())
    }

    pub async fn list_events(&self, query: EventQuery) -> Result<Vec<EventDetails>> {
        let events = self.store.list_events(query).await?;
        Ok(events.into_iter().map(EventDetails::from).collect())
    }
}
