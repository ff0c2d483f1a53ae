//! Invoicing and payment collection.

use chrono::{Datelike, Utc};
use common::{InvoiceId, PaymentId, ReservationId, UserId};
use domain::{
    BillingError, Invoice, InvoiceNumber, Money, Payment, PaymentMethod, PaymentStatus,
    Reservation,
};
use serde::{Deserialize, Serialize};
use store::{BookingStore, BookingStoreExt, StoreError};

use crate::error::{BookingError, Result};
use crate::policy::BookingPolicy;

const MARK_PAID_ATTEMPTS: usize = 3;

/// A client's payment against an invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    /// Defaults to the outstanding balance.
    #[serde(default)]
    pub amount: Option<Money>,
    pub method: PaymentMethod,
}

/// An invoice with its payment position.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub amount_paid: Money,
    pub amount_due: Money,
    pub payments: Vec<Payment>,
}

/// Outcome of recording or completing a payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: Option<Invoice>,
    pub amount_paid: Money,
    pub amount_due: Money,
    pub fully_paid: bool,
}

/// Issues invoices and records payments.
///
/// Once completed payments cover an invoice's total, the invoice is marked
/// paid and so is its reservation.
#[derive(Clone)]
pub struct BillingService<S> {
    store: S,
    policy: BookingPolicy,
}

impl<S: BookingStore> BillingService<S> {
    pub fn new(store: S, policy: BookingPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Issues the invoice for a freshly created reservation.
    #[tracing::instrument(skip(self, reservation), fields(reservation_id = %reservation.id))]
    pub async fn issue_invoice(&self, reservation: &Reservation) -> Result<Invoice> {
        let now = Utc::now();
        let year = now.year();
        let sequence = self.store.next_invoice_sequence(year).await?;
        let invoice = Invoice::issue_for(
            reservation,
            InvoiceNumber::format(year, sequence),
            self.policy.tax_rate,
            self.policy.invoice_due,
            now,
        )?;
        self.store.insert_invoice(&invoice).await?;

        metrics::counter!("invoices_issued_total").increment(1);
        tracing::info!(
            invoice_number = %invoice.number,
            total = %invoice.total,
            "invoice issued"
        );
        Ok(invoice)
    }

    /// Loads an invoice owned by `user_id`.
    pub async fn get_invoice(&self, user_id: UserId, id: InvoiceId) -> Result<InvoiceDetails> {
        let invoice = self.owned_invoice(user_id, id).await?;
        let payments = self.store.list_payments(invoice.reservation_id).await?;
        let amount_paid = completed_total(&payments);
        Ok(InvoiceDetails {
            amount_due: invoice.amount_due(amount_paid),
            amount_paid,
            invoice,
            payments,
        })
    }

    /// Records a client payment against an issued invoice.
    ///
    /// Card and mobile payments complete at once. Other methods stay pending
    /// until staff confirm them.
    #[tracing::instrument(skip(self, request), fields(method = %request.method))]
    pub async fn pay_invoice(
        &self,
        user_id: UserId,
        invoice_id: InvoiceId,
        request: PaymentRequest,
    ) -> Result<PaymentReceipt> {
        let invoice = self.owned_invoice(user_id, invoice_id).await?;
        if !invoice.status.can_accept_payment() {
            return Err(BillingError::InvalidInvoiceTransition {
                current_state: invoice.status,
                action: "pay",
            }
            .into());
        }

        let payments = self.store.list_payments(invoice.reservation_id).await?;
        let committed = committed_total(&payments);
        let outstanding = invoice.amount_due(committed);
        let amount = request.amount.unwrap_or(outstanding);
        if amount > outstanding {
            return Err(BillingError::ExceedsBalance {
                amount,
                due: outstanding,
            }
            .into());
        }

        let now = Utc::now();
        let mut payment = Payment::new(
            invoice.reservation_id,
            Some(invoice.id),
            user_id,
            amount,
            request.method,
            now,
        )?;
        if request.method.settles_immediately() {
            payment.complete(now)?;
        }
        self.store.insert_payment(&payment).await?;

        if payment.status.counts_as_paid() {
            metrics::counter!("payments_completed_total").increment(1);
        }
        tracing::info!(
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            status = %payment.status,
            "payment recorded"
        );

        self.receipt(payment, Some(invoice)).await
    }

    /// Staff discount on an unpaid invoice.
    ///
    /// The discount replaces any earlier one. It may not bring the total below
    /// what completed and pending payments already commit. If completed
    /// payments cover the new total the invoice is settled.
    #[tracing::instrument(skip(self), fields(discount = %discount))]
    pub async fn apply_discount(&self, id: InvoiceId, discount: Money) -> Result<InvoiceDetails> {
        let mut invoice = self.store.require_invoice(id).await?;
        invoice.apply_discount(discount, Utc::now())?;

        let payments = self.store.list_payments(invoice.reservation_id).await?;
        let committed = committed_total(&payments);
        if committed > invoice.total {
            return Err(BookingError::State(format!(
                "payments of {committed} already exceed the discounted total {}",
                invoice.total
            )));
        }
        self.store.update_invoice(&invoice).await?;
        tracing::info!(
            invoice_number = %invoice.number,
            total = %invoice.total,
            "discount applied"
        );

        let amount_paid = completed_total(&payments);
        if invoice.status.can_accept_payment() && invoice.is_settled_by(amount_paid) {
            invoice.mark_paid(Utc::now())?;
            self.store.update_invoice(&invoice).await?;
            self.mark_reservation_paid(invoice.reservation_id).await?;
            tracing::info!(invoice_number = %invoice.number, "invoice paid in full");
        }

        Ok(InvoiceDetails {
            amount_due: invoice.amount_due(amount_paid),
            amount_paid,
            invoice,
            payments,
        })
    }

    /// Cancels the reservation's invoice if it is still unpaid.
    ///
    /// Returns the cancelled invoice, or `None` when there was nothing to void.
    pub async fn void_invoice_for(&self, reservation_id: ReservationId) -> Result<Option<Invoice>> {
        let Some(mut invoice) = self
            .store
            .find_invoice_for_reservation(reservation_id)
            .await?
        else {
            return Ok(None);
        };
        if !invoice.status.can_cancel() {
            return Ok(None);
        }
        invoice.cancel(Utc::now())?;
        self.store.update_invoice(&invoice).await?;

        metrics::counter!("invoices_voided_total").increment(1);
        tracing::info!(invoice_number = %invoice.number, "invoice voided");
        Ok(Some(invoice))
    }

    /// Staff confirmation of a pending payment.
    #[tracing::instrument(skip(self))]
    pub async fn complete_payment(&self, id: PaymentId) -> Result<PaymentReceipt> {
        let mut payment = self.store.require_payment(id).await?;
        payment.complete(Utc::now())?;
        self.store.update_payment(&payment).await?;

        metrics::counter!("payments_completed_total").increment(1);
        tracing::info!(transaction_id = %payment.transaction_id, "payment completed");

        let invoice = match payment.invoice_id {
            Some(invoice_id) => self.store.get_invoice(invoice_id).await?,
            None => {
                self.store
                    .find_invoice_for_reservation(payment.reservation_id)
                    .await?
            }
        };
        self.receipt(payment, invoice).await
    }

    /// Staff rejection of a pending payment.
    #[tracing::instrument(skip(self))]
    pub async fn fail_payment(&self, id: PaymentId) -> Result<Payment> {
        let mut payment = self.store.require_payment(id).await?;
        payment.fail(Utc::now())?;
        self.store.update_payment(&payment).await?;
        tracing::info!(transaction_id = %payment.transaction_id, "payment failed");
        Ok(payment)
    }

    /// Staff refund of a completed payment.
    ///
    /// A paid invoice stays paid; refunds are settled outside the platform.
    #[tracing::instrument(skip(self))]
    pub async fn refund_payment(&self, id: PaymentId) -> Result<Payment> {
        let mut payment = self.store.require_payment(id).await?;
        payment.refund(Utc::now())?;
        self.store.update_payment(&payment).await?;
        tracing::info!(
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            "payment refunded"
        );
        Ok(payment)
    }

    async fn owned_invoice(&self, user_id: UserId, id: InvoiceId) -> Result<Invoice> {
        match self.store.get_invoice(id).await? {
            Some(invoice) if invoice.user_id == user_id => Ok(invoice),
            _ => Err(BookingError::not_found("invoice", id)),
        }
    }

    /// Settles the invoice if completed payments now cover it.
    async fn receipt(&self, payment: Payment, invoice: Option<Invoice>) -> Result<PaymentReceipt> {
        let amount_paid = self.store.paid_total(payment.reservation_id).await?;

        let Some(mut invoice) = invoice else {
            return Ok(PaymentReceipt {
                payment,
                invoice: None,
                amount_paid,
                amount_due: Money::zero(),
                fully_paid: false,
            });
        };

        if invoice.status.can_accept_payment() && invoice.is_settled_by(amount_paid) {
            invoice.mark_paid(Utc::now())?;
            self.store.update_invoice(&invoice).await?;
            self.mark_reservation_paid(invoice.reservation_id).await?;
            tracing::info!(invoice_number = %invoice.number, "invoice paid in full");
        }

        Ok(PaymentReceipt {
            amount_due: invoice.amount_due(amount_paid),
            fully_paid: invoice.status == domain::InvoiceStatus::Paid,
            amount_paid,
            payment,
            invoice: Some(invoice),
        })
    }

    async fn mark_reservation_paid(&self, id: ReservationId) -> Result<()> {
        for _ in 0..MARK_PAID_ATTEMPTS {
            let mut reservation = self.store.require_reservation(id).await?;
            if reservation.is_paid {
                return Ok(());
            }
            reservation.mark_paid(Utc::now());
            match self.store.update_reservation(&reservation).await {
                Ok(_) => return Ok(()),
                Err(StoreError::ConcurrencyConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict {
            entity: "reservation",
            id: id.as_uuid(),
        })
    }
}

fn completed_total(payments: &[Payment]) -> Money {
    payments
        .iter()
        .filter(|p| p.status.counts_as_paid())
        .map(|p| p.amount)
        .sum()
}

/// Completed payments plus those still awaiting confirmation.
fn committed_total(payments: &[Payment]) -> Money {
    payments
        .iter()
        .filter(|p| matches!(p.status, PaymentStatus::Completed | PaymentStatus::Pending))
        .map(|p| p.amount)
        .sum()
}
