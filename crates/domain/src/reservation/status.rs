//! Reservation status.

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// The state of a reservation.
///
/// State transitions:
/// ```text
/// Confirmed ──► Cancelled
/// ```
/// `Pending` exists for stored data compatibility. No flow creates it, but a
/// pending reservation may still be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Seats are held for the user.
    #[default]
    Confirmed,

    /// Declared but never reached.
    Pending,

    /// Seats were returned (terminal state).
    Cancelled,
}

impl ReservationStatus {
    /// Returns true if the seat count may change in this state.
    pub fn can_update(&self) -> bool {
        matches!(self, ReservationStatus::Confirmed)
    }

    /// Returns true if cancelling would release seats.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if a confirmation may be sent again.
    pub fn can_resend_confirmation(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled)
    }

    /// Returns true if the reservation holds seats.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Pending => "pending",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "pending" => Ok(ReservationStatus::Pending),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(UnknownVariant::new("reservation status", other)),
        }
    }
}
