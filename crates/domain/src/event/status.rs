//! Event status lifecycle and category.

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// The publication status of an event.
///
/// State transitions:
/// ```text
/// Draft ──► Pending ──► Confirmed ──► Finished
///   │          │            │
///   └──────────┴────────────┴──► Cancelled
/// ```
/// `Draft` may also be confirmed directly. Only `Confirmed` events accept
/// reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Being prepared by staff, not visible to visitors.
    Draft,

    /// Awaiting validation.
    #[default]
    Pending,

    /// Published and bookable.
    Confirmed,

    /// Called off (terminal state).
    Cancelled,

    /// Took place (terminal state).
    Finished,
}

impl EventStatus {
    /// Returns true if an event may be created directly in this status.
    pub fn is_initial(&self) -> bool {
        matches!(self, EventStatus::Draft | EventStatus::Pending)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Confirmed)
                | (Pending, Confirmed)
                | (Confirmed, Finished)
                | (Draft | Pending | Confirmed, Cancelled)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Cancelled | EventStatus::Finished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Pending => "pending",
            EventStatus::Confirmed => "confirmed",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "pending" => Ok(EventStatus::Pending),
            "confirmed" => Ok(EventStatus::Confirmed),
            "cancelled" => Ok(EventStatus::Cancelled),
            "finished" => Ok(EventStatus::Finished),
            other => Err(UnknownVariant::new("event status", other)),
        }
    }
}

/// What kind of event this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Music,
    Business,
    Gastronomy,
    Sport,
    Culture,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Music => "music",
            Category::Business => "business",
            Category::Gastronomy => "gastronomy",
            Category::Sport => "sport",
            Category::Culture => "culture",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "music" => Ok(Category::Music),
            "business" => Ok(Category::Business),
            "gastronomy" => Ok(Category::Gastronomy),
            "sport" => Ok(Category::Sport),
            "culture" => Ok(Category::Culture),
            other => Err(UnknownVariant::new("category", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(EventStatus::default(), EventStatus::Pending);
    }

    #[test]
    fn only_draft_and_pending_are_initial() {
        assert!(EventStatus::Draft.is_initial());
        assert!(EventStatus::Pending.is_initial());
        assert!(!EventStatus::Confirmed.is_initial());
        assert!(!EventStatus::Cancelled.is_initial());
        assert!(!EventStatus::Finished.is_initial());
    }

    #[test]
    fn confirmation_paths() {
        assert!(EventStatus::Draft.can_transition_to(EventStatus::Confirmed));
        assert!(EventStatus::Pending.can_transition_to(EventStatus::Confirmed));
        assert!(!EventStatus::Finished.can_transition_to(EventStatus::Confirmed));
        assert!(!EventStatus::Cancelled.can_transition_to(EventStatus::Confirmed));
    }

    #[test]
    fn only_confirmed_events_finish() {
        assert!(EventStatus::Confirmed.can_transition_to(EventStatus::Finished));
        assert!(!EventStatus::Pending.can_transition_to(EventStatus::Finished));
        assert!(!EventStatus::Draft.can_transition_to(EventStatus::Finished));
    }

    #[test]
    fn terminal_states_are_frozen() {
        for terminal in [EventStatus::Cancelled, EventStatus::Finished] {
            assert!(terminal.is_terminal());
            for next in [
                EventStatus::Draft,
                EventStatus::Pending,
                EventStatus::Confirmed,
                EventStatus::Cancelled,
                EventStatus::Finished,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_text_round_trips() {
        for status in [
            EventStatus::Draft,
            EventStatus::Pending,
            EventStatus::Confirmed,
            EventStatus::Cancelled,
            EventStatus::Finished,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        assert!("archived".parse::<EventStatus>().is_err());
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::Gastronomy).unwrap();
        assert_eq!(json, "\"gastronomy\"");
        assert_eq!("sport".parse::<Category>().unwrap(), Category::Sport);
    }
}
