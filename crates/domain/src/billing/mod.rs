//! Invoices and payments attached to reservations.

mod invoice;
mod payment;

pub use invoice::{Invoice, InvoiceNumber, InvoiceStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus, TransactionId};

use thiserror::Error;

use crate::money::Money;

/// Errors raised by invoice and payment rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Amounts must be greater than zero.
    #[error("Invalid amount: {amount} (must be greater than 0)")]
    InvalidAmount { amount: Money },

    /// Discount larger than what is owed.
    #[error("Discount {discount} exceeds invoice subtotal plus tax {gross}")]
    DiscountTooLarge { discount: Money, gross: Money },

    /// Tax or total does not fit in a money amount.
    #[error("Invoice amounts for subtotal {subtotal} are out of range")]
    AmountOutOfRange { subtotal: Money },

    /// Payment would exceed what is still owed.
    #[error("Payment of {amount} exceeds the outstanding balance of {due}")]
    ExceedsBalance { amount: Money, due: Money },

    /// Invoice is not in a state that allows the action.
    #[error("Invalid invoice transition: cannot {action} from {current_state} state")]
    InvalidInvoiceTransition {
        current_state: InvoiceStatus,
        action: &'static str,
    },

    /// Payment is not in a state that allows the action.
    #[error("Invalid payment transition: cannot {action} from {current_state} state")]
    InvalidPaymentTransition {
        current_state: PaymentStatus,
        action: &'static str,
    },
}
