//! Invoice record and numbering.

use chrono::{DateTime, Duration, Utc};
use common::{InvoiceId, ReservationId, UserId};
use serde::{Deserialize, Serialize};

use super::BillingError;
use crate::error::UnknownVariant;
use crate::money::{Money, TaxRate};
use crate::reservation::Reservation;

/// Invoice number of the form `INV{year}{sequence:05}`, e.g. `INV202600042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Formats the `sequence`-th invoice of `year`.
    pub fn format(year: i32, sequence: u32) -> Self {
        Self(format!("INV{year}{sequence:05}"))
    }

    /// Wraps a number loaded from storage.
    pub fn from_string(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The lifecycle of an invoice.
///
/// ```text
/// Draft ──► Issued ──► Paid
///   │         │
///   └─────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn can_issue(&self) -> bool {
        matches!(self, InvoiceStatus::Draft)
    }

    /// Payments are only accepted against an issued invoice.
    pub fn can_accept_payment(&self) -> bool {
        matches!(self, InvoiceStatus::Issued)
    }

    /// Discounts may be granted until the invoice is settled or voided.
    pub fn can_discount(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Issued)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Issued)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "issued" => Ok(InvoiceStatus::Issued),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(UnknownVariant::new("invoice status", other)),
        }
    }
}

/// Billing document derived from a reservation's price.
///
/// `total = subtotal + tax_amount - discount`, kept in sync by
/// [`Invoice::calculate_total`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: InvoiceNumber,
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub discount: Money,
    pub total: Money,
    pub status: InvoiceStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Drafts an invoice for the reservation's current total.
    pub fn draft_for(
        reservation: &Reservation,
        number: InvoiceNumber,
        tax_rate: TaxRate,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let mut invoice = Self {
            id: InvoiceId::new(),
            number,
            reservation_id: reservation.id,
            user_id: reservation.user_id,
            subtotal: reservation.total_price,
            tax_rate,
            tax_amount: Money::zero(),
            discount: Money::zero(),
            total: Money::zero(),
            status: InvoiceStatus::Draft,
            issued_at: None,
            due_date: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        invoice.calculate_total()?;
        Ok(invoice)
    }

    /// Drafts and immediately issues an invoice, optionally due `due_in` from now.
    pub fn issue_for(
        reservation: &Reservation,
        number: InvoiceNumber,
        tax_rate: TaxRate,
        due_in: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let mut invoice = Self::draft_for(reservation, number, tax_rate, now)?;
        invoice.due_date = due_in.map(|d| now + d);
        invoice.mark_issued(now)?;
        Ok(invoice)
    }

    /// Tax on the subtotal and the pre-discount total.
    fn tax_and_gross(&self) -> Result<(Money, Money), BillingError> {
        let out_of_range = || BillingError::AmountOutOfRange {
            subtotal: self.subtotal,
        };
        let tax = self.tax_rate.apply(self.subtotal).ok_or_else(out_of_range)?;
        let gross = self.subtotal.checked_add(tax).ok_or_else(out_of_range)?;
        Ok((tax, gross))
    }

    /// Recomputes tax and total from subtotal, rate and discount.
    pub fn calculate_total(&mut self) -> Result<(), BillingError> {
        let (tax, gross) = self.tax_and_gross()?;
        self.tax_amount = tax;
        self.total = gross.saturating_sub(self.discount);
        Ok(())
    }

    /// Replaces the discount on a draft or issued invoice.
    ///
    /// The discount may not exceed subtotal plus tax.
    pub fn apply_discount(&mut self, discount: Money, now: DateTime<Utc>) -> Result<(), BillingError> {
        if !self.status.can_discount() {
            return Err(BillingError::InvalidInvoiceTransition {
                current_state: self.status,
                action: "discount",
            });
        }
        let (_, gross) = self.tax_and_gross()?;
        if discount.is_negative() || discount > gross {
            return Err(BillingError::DiscountTooLarge { discount, gross });
        }
        self.discount = discount;
        self.calculate_total()?;
        self.updated_at = now;
        Ok(())
    }

    /// What is still owed once `paid` has been collected.
    pub fn amount_due(&self, paid: Money) -> Money {
        self.total.saturating_sub(paid)
    }

    /// Returns true once `paid` covers the total.
    pub fn is_settled_by(&self, paid: Money) -> bool {
        paid >= self.total
    }

    pub fn mark_issued(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        if !self.status.can_issue() {
            return Err(BillingError::InvalidInvoiceTransition {
                current_state: self.status,
                action: "issue",
            });
        }
        self.status = InvoiceStatus::Issued;
        self.issued_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        if !self.status.can_accept_payment() {
            return Err(BillingError::InvalidInvoiceTransition {
                current_state: self.status,
                action: "mark paid",
            });
        }
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        if !self.status.can_cancel() {
            return Err(BillingError::InvalidInvoiceTransition {
                current_state: self.status,
                action: "cancel",
            });
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Category, Event, EventStatus, NewEvent};

    fn reservation(price_units: i64, seats: u32) -> Reservation {
        let now = Utc::now();
        let mut event = Event::create(
            NewEvent {
                title: "Expo".to_string(),
                description: String::new(),
                category: Category::Business,
                date: now + Duration::days(3),
                location: "Sfax".to_string(),
                capacity: 100,
                available_seats: None,
                price_per_person: Money::from_units(price_units),
                status: EventStatus::Draft,
                image_url: None,
            },
            now,
        )
        .unwrap();
        event.transition_to(EventStatus::Confirmed, now).unwrap();
        Reservation::confirmed(&event, UserId::new(), seats, "", now).unwrap()
    }

    #[test]
    fn number_is_zero_padded() {
        assert_eq!(InvoiceNumber::format(2026, 42).as_str(), "INV202600042");
        assert_eq!(InvoiceNumber::format(2026, 123456).as_str(), "INV2026123456");
    }

    #[test]
    fn issue_for_applies_vat() {
        let r = reservation(50, 2);
        let now = Utc::now();
        let invoice = Invoice::issue_for(
            &r,
            InvoiceNumber::format(2026, 1),
            TaxRate::STANDARD,
            None,
            now,
        )
        .unwrap();

        assert_eq!(invoice.subtotal, Money::from_units(100));
        assert_eq!(invoice.tax_amount, Money::from_units(19));
        assert_eq!(invoice.total, Money::from_units(119));
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert_eq!(invoice.issued_at, Some(now));
        assert_eq!(invoice.reservation_id, r.id);
        assert!(invoice.due_date.is_none());
    }

    #[test]
    fn due_date_is_offset_from_issue() {
        let r = reservation(10, 1);
        let now = Utc::now();
        let invoice = Invoice::issue_for(
            &r,
            InvoiceNumber::format(2026, 2),
            TaxRate::STANDARD,
            Some(Duration::days(30)),
            now,
        )
        .unwrap();
        assert_eq!(invoice.due_date, Some(now + Duration::days(30)));
    }

    #[test]
    fn discount_reduces_total_until_paid() {
        let r = reservation(100, 1);
        let now = Utc::now();
        let mut invoice =
            Invoice::draft_for(&r, InvoiceNumber::format(2026, 3), TaxRate::STANDARD, now)
                .unwrap();
        invoice.apply_discount(Money::from_units(9), now).unwrap();
        assert_eq!(invoice.total, Money::from_units(110));

        invoice.mark_issued(now).unwrap();
        invoice.apply_discount(Money::from_units(19), now).unwrap();
        assert_eq!(invoice.discount, Money::from_units(19));
        assert_eq!(invoice.total, Money::from_units(100));

        invoice.mark_paid(now).unwrap();
        assert!(matches!(
            invoice.apply_discount(Money::from_units(1), now),
            Err(BillingError::InvalidInvoiceTransition { .. })
        ));
        assert_eq!(invoice.total, Money::from_units(100));
    }

    #[test]
    fn out_of_range_tax_is_an_error() {
        let r = reservation(10, 1);
        let now = Utc::now();
        let mut invoice =
            Invoice::draft_for(&r, InvoiceNumber::format(2026, 8), TaxRate::STANDARD, now)
                .unwrap();
        invoice.subtotal = Money::from_cents(i64::MAX - 1);
        assert_eq!(
            invoice.calculate_total(),
            Err(BillingError::AmountOutOfRange {
                subtotal: Money::from_cents(i64::MAX - 1)
            })
        );
        assert_eq!(invoice.total, Money::from_cents(1190));
    }

    #[test]
    fn oversized_discount_rejected() {
        let r = reservation(10, 1);
        let now = Utc::now();
        let mut invoice =
            Invoice::draft_for(&r, InvoiceNumber::format(2026, 4), TaxRate::STANDARD, now)
                .unwrap();
        assert!(matches!(
            invoice.apply_discount(Money::from_units(100), now),
            Err(BillingError::DiscountTooLarge { .. })
        ));
    }

    #[test]
    fn amount_due_floors_at_zero() {
        let r = reservation(10, 1);
        let invoice = Invoice::issue_for(
            &r,
            InvoiceNumber::format(2026, 5),
            TaxRate::from_basis_points(0),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(invoice.amount_due(Money::from_units(4)), Money::from_units(6));
        assert_eq!(invoice.amount_due(Money::from_units(40)), Money::zero());
        assert!(invoice.is_settled_by(Money::from_units(10)));
        assert!(!invoice.is_settled_by(Money::from_units(9)));
    }

    #[test]
    fn paid_invoice_cannot_be_cancelled() {
        let r = reservation(10, 1);
        let now = Utc::now();
        let mut invoice = Invoice::issue_for(
            &r,
            InvoiceNumber::format(2026, 6),
            TaxRate::STANDARD,
            None,
            now,
        )
        .unwrap();
        invoice.mark_paid(now).unwrap();
        assert_eq!(invoice.paid_at, Some(now));
        assert!(invoice.cancel(now).is_err());
        assert!(invoice.mark_paid(now).is_err());
    }

    #[test]
    fn draft_invoice_does_not_accept_payment() {
        let r = reservation(10, 1);
        let now = Utc::now();
        let mut invoice =
            Invoice::draft_for(&r, InvoiceNumber::format(2026, 7), TaxRate::STANDARD, now)
                .unwrap();
        assert_eq!(
            invoice.mark_paid(now),
            Err(BillingError::InvalidInvoiceTransition {
                current_state: InvoiceStatus::Draft,
                action: "mark paid",
            })
        );
        invoice.cancel(now).unwrap();
        assert!(invoice.status.is_terminal());
    }
}
