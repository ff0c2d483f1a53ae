use chrono::{DateTime, Utc};
use common::ReservationId;
use domain::{Event, Reservation, ReservationCode};
use serde::Serialize;

/// Admission ticket for a reservation.
///
/// `payload` is the text to encode into a scannable code. Rendering it as an
/// image is left to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub reservation_id: ReservationId,
    pub reservation_code: ReservationCode,
    pub payload: String,
    pub event_title: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub seats: u32,
}

impl Ticket {
    pub fn new(reservation: &Reservation, event: &Event) -> Self {
        Self {
            reservation_id: reservation.id,
            reservation_code: reservation.code.clone(),
            payload: reservation.ticket_payload(),
            event_title: event.title.clone(),
            event_date: event.date,
            location: event.location.clone(),
            seats: reservation.number_of_seats,
        }
    }
}
