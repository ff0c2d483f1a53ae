use chrono::{DateTime, Utc};
use common::{EventId, UserId};
use domain::{Category, Event, EventStatus, Reservation, ReservationStatus};

/// Filter for listing events.
///
/// Results are ordered by event date, soonest first.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Filter by status.
    pub status: Option<EventStatus>,

    /// Filter by category.
    pub category: Option<Category>,

    /// Only events dated after this instant.
    pub starting_after: Option<DateTime<Utc>>,

    /// Maximum number of events to return.
    pub limit: Option<usize>,

    /// Number of events to skip.
    pub offset: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmed events that have not started yet.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self::new()
            .status(EventStatus::Confirmed)
            .starting_after(now)
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn starting_after(mut self, instant: DateTime<Utc>) -> Self {
        self.starting_after = Some(instant);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `event` passes every filter (paging aside).
    pub fn matches(&self, event: &Event) -> bool {
        self.status.is_none_or(|s| event.status == s)
            && self.category.is_none_or(|c| event.category == c)
            && self.starting_after.is_none_or(|t| event.date > t)
    }
}

/// Filter for listing reservations.
///
/// Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct ReservationQuery {
    /// Filter by owner.
    pub user_id: Option<UserId>,

    /// Filter by event.
    pub event_id: Option<EventId>,

    /// Filter by status (any of these).
    pub statuses: Option<Vec<ReservationStatus>>,

    /// Maximum number of reservations to return.
    pub limit: Option<usize>,

    /// Number of reservations to skip.
    pub offset: Option<usize>,
}

impl ReservationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reservations owned by a user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Reservations made for an event.
    pub fn for_event(event_id: EventId) -> Self {
        Self {
            event_id: Some(event_id),
            ..Default::default()
        }
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn event_id(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn status(mut self, status: ReservationStatus) -> Self {
        self.statuses = Some(vec![status]);
        self
    }

    /// Reservations still holding seats.
    pub fn active(mut self) -> Self {
        self.statuses = Some(vec![ReservationStatus::Confirmed, ReservationStatus::Pending]);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.user_id.is_none_or(|u| reservation.user_id == u)
            && self.event_id.is_none_or(|e| reservation.event_id == e)
            && self
                .statuses
                .as_ref()
                .is_none_or(|s| s.contains(&reservation.status))
    }
}
