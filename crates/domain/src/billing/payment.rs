//! Payment record.

use chrono::{DateTime, Utc};
use common::{InvoiceId, PaymentId, ReservationId, UserId};
use serde::{Deserialize, Serialize};

use super::BillingError;
use crate::error::UnknownVariant;
use crate::money::Money;

/// Unique payment reference: `TXN`, a UTC timestamp and six random
/// upper-case alphanumerics, e.g. `TXN20261019143005K3Z9QA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    const ALPHABET: &'static [u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const SUFFIX_LEN: usize = 6;

    pub fn generate(now: DateTime<Utc>) -> Self {
        let entropy = uuid::Uuid::new_v4();
        let suffix: String = entropy
            .as_bytes()
            .iter()
            .take(Self::SUFFIX_LEN)
            .map(|b| Self::ALPHABET[usize::from(*b) % Self::ALPHABET.len()] as char)
            .collect();
        Self(format!("TXN{}{suffix}", now.format("%Y%m%d%H%M%S")))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Mobile,
    Cheque,
}

impl PaymentMethod {
    /// Card and mobile payments are confirmed by the provider on the spot.
    /// Cash, cheque and transfers wait for staff to confirm receipt.
    pub fn settles_immediately(&self) -> bool {
        matches!(self, PaymentMethod::Card | PaymentMethod::Mobile)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Mobile => "mobile",
            PaymentMethod::Cheque => "cheque",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "mobile" => Ok(PaymentMethod::Mobile),
            "cheque" => Ok(PaymentMethod::Cheque),
            other => Err(UnknownVariant::new("payment method", other)),
        }
    }
}

/// The state of a payment.
///
/// ```text
/// Pending ──► Completed ──► Refunded
///    │
///    └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn can_complete(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    pub fn can_fail(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    pub fn can_refund(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    /// Returns true if the amount counts towards the invoice.
    pub fn counts_as_paid(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(UnknownVariant::new("payment status", other)),
        }
    }
}

/// Money received (or expected) against a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    pub invoice_id: Option<InvoiceId>,
    pub user_id: UserId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: TransactionId,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Records a pending payment.
    pub fn new(
        reservation_id: ReservationId,
        invoice_id: Option<InvoiceId>,
        user_id: UserId,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        if !amount.is_positive() {
            return Err(BillingError::InvalidAmount { amount });
        }
        Ok(Self {
            id: PaymentId::new(),
            reservation_id,
            invoice_id,
            user_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            transaction_id: TransactionId::generate(now),
            paid_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        self.transition(PaymentStatus::Completed, "complete", now)?;
        self.paid_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        self.transition(PaymentStatus::Failed, "fail", now)
    }

    pub fn refund(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        self.transition(PaymentStatus::Refunded, "refund", now)
    }

    fn transition(
        &mut self,
        next: PaymentStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        let allowed = match next {
            PaymentStatus::Completed => self.status.can_complete(),
            PaymentStatus::Failed => self.status.can_fail(),
            PaymentStatus::Refunded => self.status.can_refund(),
            PaymentStatus::Pending => false,
        };
        if !allowed {
            return Err(BillingError::InvalidPaymentTransition {
                current_state: self.status,
                action,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
