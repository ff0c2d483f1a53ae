//! Reservation lifecycle orchestration.

use std::time::Instant;

use chrono::Utc;
use common::{EventId, ReservationId, UserId};
use domain::{Event, Invoice, Money, Payment, Reservation, ReservationCode, SeatDelta};
use serde::{Deserialize, Serialize};
use store::{BookingStore, BookingStoreExt, ReservationQuery, StoreError};

use crate::billing::BillingService;
use crate::error::{BookingError, CapacityError, Result};
use crate::policy::BookingPolicy;
use crate::services::{Confirmation, ConfirmationKind, Notifier};
use crate::ticket::Ticket;

/// Request to book seats.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub seats: u32,
    #[serde(default)]
    pub notes: String,
}

/// Edit of an existing reservation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationChange {
    pub seats: Option<u32>,
    pub notes: Option<String>,
}

/// Something that went wrong after the reservation itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BookingWarning {
    InvoiceNotIssued { reason: String },
    NotificationFailed { reason: String },
    InvoiceOutOfDate { invoiced: Money, current: Money },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationCreated {
    pub reservation: Reservation,
    pub invoice: Option<Invoice>,
    pub ticket: Ticket,
    pub warnings: Vec<BookingWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationUpdated {
    pub reservation: Reservation,
    /// The existing invoice no longer matches the reservation total.
    pub invoice_out_of_date: bool,
    pub warnings: Vec<BookingWarning>,
}

/// Everything shown on a reservation's page.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub event: Event,
    pub ticket: Ticket,
    pub can_be_cancelled: bool,
    pub invoice: Option<Invoice>,
    pub payments: Vec<Payment>,
}

/// A user's reservations, newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReservationList {
    pub active: Vec<Reservation>,
    pub cancelled: Vec<Reservation>,
}

enum CancelOutcome {
    Cancelled(Reservation, u32),
    AlreadyClosed(Reservation),
    Raced(Reservation),
}

/// Runs the reservation lifecycle against the seat inventory.
///
/// Flow of a booking:
/// 1. Check the event is bookable
/// 2. Take the seats with one conditional update
/// 3. Write the reservation (seats are released again if this fails)
/// 4. Issue the invoice and send the confirmation, best effort
#[derive(Clone)]
pub struct ReservationService<S, N> {
    store: S,
    notifier: N,
    billing: BillingService<S>,
    policy: BookingPolicy,
}

impl<S, N> ReservationService<S, N>
where
    S: BookingStore + Clone,
    N: Notifier,
{
    pub fn new(store: S, notifier: N, policy: BookingPolicy) -> Self {
        let billing = BillingService::new(store.clone(), policy.clone());
        Self {
            store,
            notifier,
            billing,
            policy,
        }
    }

    pub fn billing(&self) -> &BillingService<S> {
        &self.billing
    }

    /// Books `request.seats` on an event for `user_id`.
    #[tracing::instrument(skip(self, request), fields(seats = request.seats))]
    pub async fn create(
        &self,
        user_id: UserId,
        event_id: EventId,
        request: NewReservation,
    ) -> Result<ReservationCreated> {
        let started = Instant::now();
        let result = self.create_inner(user_id, event_id, request).await;
        metrics::histogram!("reservation_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        if let Err(BookingError::Capacity(ref err)) = result {
            metrics::counter!("capacity_rejections_total").increment(1);
            tracing::info!(%event_id, reason = %err, "reservation rejected");
        }
        result
    }

    async fn create_inner(
        &self,
        user_id: UserId,
        event_id: EventId,
        request: NewReservation,
    ) -> Result<ReservationCreated> {
        if request.seats == 0 {
            return Err(BookingError::Validation(
                "number of seats must be greater than 0".to_string(),
            ));
        }

        let event = self.store.require_event(event_id).await?;
        if let Some(reason) = event.not_bookable_reason(Utc::now()) {
            return Err(CapacityError::NotBookable { event_id, reason }.into());
        }

        let reservation = Reservation::confirmed(
            &event,
            user_id,
            request.seats,
            request.notes,
            Utc::now(),
        )?;

        let event = self.store.reserve_seats(event_id, request.seats).await?;
        let reservation = match self.store.insert_reservation(&reservation).await {
            Ok(stored) => stored,
            Err(err) => {
                self.compensate_seats(event_id, request.seats, &err).await;
                return Err(err.into());
            }
        };

        metrics::counter!("reservations_created_total").increment(1);
        tracing::info!(
            reservation_id = %reservation.id,
            code = %reservation.code,
            available_seats = event.available_seats,
            "reservation created"
        );

        let mut warnings = Vec::new();
        let invoice = match self.billing.issue_invoice(&reservation).await {
            Ok(invoice) => Some(invoice),
            Err(err) => {
                tracing::warn!(reservation_id = %reservation.id, error = %err, "invoice not issued");
                warnings.push(BookingWarning::InvoiceNotIssued {
                    reason: err.to_string(),
                });
                None
            }
        };

        let ticket = Ticket::new(&reservation, &event);
        if let Err(err) = self
            .notify(&reservation, ticket.clone(), ConfirmationKind::Booked)
            .await
        {
            warnings.push(BookingWarning::NotificationFailed {
                reason: err.to_string(),
            });
        }

        Ok(ReservationCreated {
            reservation,
            invoice,
            ticket,
            warnings,
        })
    }

    /// Changes the seat count and/or notes of a confirmed reservation.
    ///
    /// An existing invoice is not rebilled. When it no longer matches the new
    /// total the outcome says so.
    #[tracing::instrument(skip(self, change))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: ReservationId,
        change: ReservationChange,
    ) -> Result<ReservationUpdated> {
        let mut reservation = self.owned(user_id, id).await?;
        let event = self.store.require_event(reservation.event_id).await?;
        let now = Utc::now();

        let seats = change.seats.unwrap_or(reservation.number_of_seats);
        let delta = reservation.apply_seat_change(seats, event.price_per_person, now)?;

        if let SeatDelta::Increase(extra) = delta {
            self.store
                .reserve_seats(event.id, extra)
                .await
                .inspect_err(|_| {
                    metrics::counter!("capacity_rejections_total").increment(1);
                })?;
        }

        if let Some(notes) = change.notes {
            reservation.set_notes(notes, now);
        }

        let reservation = match self.store.update_reservation(&reservation).await {
            Ok(stored) => stored,
            Err(err) => {
                if let SeatDelta::Increase(extra) = delta {
                    self.compensate_seats(event.id, extra, &err).await;
                }
                return Err(err.into());
            }
        };

        if let SeatDelta::Decrease(freed) = delta {
            self.store.release_seats(event.id, freed).await.inspect_err(|err| {
                tracing::error!(
                    reservation_id = %id,
                    event_id = %event.id,
                    seats = freed,
                    error = %err,
                    "reservation shrunk but seats were not returned"
                );
            })?;
        }

        metrics::counter!("reservations_updated_total").increment(1);
        tracing::info!(?delta, seats, "reservation updated");

        let mut warnings = Vec::new();
        let mut invoice_out_of_date = false;
        if let Some(invoice) = self.store.find_invoice_for_reservation(id).await?
            && invoice.subtotal != reservation.total_price
        {
            tracing::warn!(
                invoice_number = %invoice.number,
                invoiced = %invoice.subtotal,
                current = %reservation.total_price,
                "invoice no longer matches reservation total"
            );
            invoice_out_of_date = true;
            warnings.push(BookingWarning::InvoiceOutOfDate {
                invoiced: invoice.subtotal,
                current: reservation.total_price,
            });
        }

        Ok(ReservationUpdated {
            reservation,
            invoice_out_of_date,
            warnings,
        })
    }

    /// Cancels a reservation, returns its seats and voids an unpaid invoice.
    ///
    /// Cancelling an already cancelled reservation changes nothing and
    /// succeeds. A write that loses a race against another update (a payment
    /// marking it paid, say) is retried once on the fresh copy.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, id: ReservationId) -> Result<Reservation> {
        let reservation = self.owned(user_id, id).await?;
        if reservation.status.is_terminal() {
            return Ok(reservation);
        }
        let event = self.store.require_event(reservation.event_id).await?;

        let (reservation, seats) = match self.write_cancellation(reservation, &event).await? {
            CancelOutcome::Cancelled(stored, seats) => (stored, seats),
            CancelOutcome::AlreadyClosed(current) => return Ok(current),
            CancelOutcome::Raced(current) => {
                tracing::debug!(reservation_id = %id, "cancel raced another update, retrying");
                match self.write_cancellation(current, &event).await? {
                    CancelOutcome::Cancelled(stored, seats) => (stored, seats),
                    CancelOutcome::AlreadyClosed(current) => return Ok(current),
                    CancelOutcome::Raced(_) => {
                        return Err(BookingError::Conflict {
                            entity: "reservation",
                            id: id.as_uuid(),
                        });
                    }
                }
            }
        };

        let event = self.store.release_seats(event.id, seats).await.inspect_err(|err| {
            tracing::error!(
                reservation_id = %id,
                seats,
                error = %err,
                "reservation cancelled but seats were not returned"
            );
        })?;

        metrics::counter!("reservations_cancelled_total").increment(1);
        tracing::info!(
            code = %reservation.code,
            seats,
            available_seats = event.available_seats,
            "reservation cancelled"
        );

        if let Err(err) = self.billing.void_invoice_for(id).await {
            tracing::warn!(reservation_id = %id, error = %err, "invoice not voided");
        }
        Ok(reservation)
    }

    /// Marks `reservation` cancelled and writes it with a version check.
    async fn write_cancellation(
        &self,
        mut reservation: Reservation,
        event: &Event,
    ) -> Result<CancelOutcome> {
        if reservation.status.is_terminal() {
            return Ok(CancelOutcome::AlreadyClosed(reservation));
        }
        let now = Utc::now();
        if !reservation.can_be_cancelled(event.date, now, self.policy.cancellation_cutoff) {
            return Err(BookingError::State(format!(
                "reservation {} can no longer be cancelled",
                reservation.code
            )));
        }
        let Some(seats) = reservation.cancel(now) else {
            return Ok(CancelOutcome::AlreadyClosed(reservation));
        };

        match self.store.update_reservation(&reservation).await {
            Ok(stored) => Ok(CancelOutcome::Cancelled(stored, seats)),
            Err(StoreError::ConcurrencyConflict { .. }) => {
                let current = self.store.require_reservation(reservation.id).await?;
                if current.status.is_terminal() {
                    Ok(CancelOutcome::AlreadyClosed(current))
                } else {
                    Ok(CancelOutcome::Raced(current))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Sends the confirmation again. Delivery failures are returned.
    #[tracing::instrument(skip(self))]
    pub async fn resend_confirmation(&self, user_id: UserId, id: ReservationId) -> Result<Ticket> {
        let reservation = self.owned(user_id, id).await?;
        if !reservation.status.can_resend_confirmation() {
            return Err(BookingError::State(format!(
                "reservation {} is {}",
                reservation.code, reservation.status
            )));
        }
        let event = self.store.require_event(reservation.event_id).await?;
        let ticket = Ticket::new(&reservation, &event);
        self.notify(&reservation, ticket.clone(), ConfirmationKind::Resent)
            .await?;
        Ok(ticket)
    }

    pub async fn get(&self, user_id: UserId, id: ReservationId) -> Result<Reservation> {
        self.owned(user_id, id).await
    }

    /// Staff lookup by the code printed on the ticket.
    ///
    /// Codes are matched case-insensitively. `None` when no reservation has it.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<Option<ReservationDetails>> {
        let code = ReservationCode::from_string(code.trim().to_ascii_uppercase());
        if !code.is_well_formed() {
            return Err(BookingError::Validation(format!(
                "malformed reservation code: {code}"
            )));
        }
        let Some(reservation) = self.store.find_reservation_by_code(&code).await? else {
            return Ok(None);
        };
        let event = self.store.require_event(reservation.event_id).await?;
        let invoice = self
            .store
            .find_invoice_for_reservation(reservation.id)
            .await?;
        let payments = self.store.list_payments(reservation.id).await?;

        Ok(Some(ReservationDetails {
            ticket: Ticket::new(&reservation, &event),
            can_be_cancelled: reservation.can_be_cancelled(
                event.date,
                Utc::now(),
                self.policy.cancellation_cutoff,
            ),
            reservation,
            event,
            invoice,
            payments,
        }))
    }

    pub async fn detail(&self, user_id: UserId, id: ReservationId) -> Result<ReservationDetails> {
        let reservation = self.owned(user_id, id).await?;
        let event = self.store.require_event(reservation.event_id).await?;
        let invoice = self.store.find_invoice_for_reservation(id).await?;
        let payments = self.store.list_payments(id).await?;

        Ok(ReservationDetails {
            ticket: Ticket::new(&reservation, &event),
            can_be_cancelled: reservation.can_be_cancelled(
                event.date,
                Utc::now(),
                self.policy.cancellation_cutoff,
            ),
            reservation,
            event,
            invoice,
            payments,
        })
    }

    /// The user's reservations split into active and cancelled.
    pub async fn list(&self, user_id: UserId) -> Result<ReservationList> {
        let all = self
            .store
            .list_reservations(ReservationQuery::for_user(user_id))
            .await?;
        let (cancelled, active): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|r| r.status.is_terminal());
        Ok(ReservationList { active, cancelled })
    }

    /// Loads a reservation, hiding ones owned by someone else.
    async fn owned(&self, user_id: UserId, id: ReservationId) -> Result<Reservation> {
        match self.store.get_reservation(id).await? {
            Some(reservation) if reservation.user_id == user_id => Ok(reservation),
            _ => Err(BookingError::not_found("reservation", id)),
        }
    }

    async fn notify(
        &self,
        reservation: &Reservation,
        ticket: Ticket,
        kind: ConfirmationKind,
    ) -> Result<()> {
        let confirmation = Confirmation {
            kind,
            user_id: reservation.user_id,
            total_price: reservation.total_price,
            ticket,
        };
        self.notifier
            .send_confirmation(&confirmation)
            .await
            .map_err(|err| {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::warn!(code = %reservation.code, error = %err, "confirmation not delivered");
                err.into()
            })
    }

    /// Returns seats taken for a write that then failed.
    async fn compensate_seats(&self, event_id: EventId, seats: u32, cause: &StoreError) {
        tracing::warn!(%event_id, seats, error = %cause, "releasing seats after failed write");
        if let Err(err) = self.store.release_seats(event_id, seats).await {
            tracing::error!(
                %event_id,
                seats,
                error = %err,
                "compensating seat release failed"
            );
        }
    }
}
