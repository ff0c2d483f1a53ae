use chrono::Duration;
use domain::TaxRate;

/// Business settings applied by the booking services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPolicy {
    /// VAT charged on invoices.
    pub tax_rate: TaxRate,

    /// How long before the event cancellations close. Zero means until the
    /// event starts.
    pub cancellation_cutoff: Duration,

    /// Invoice payment term. `None` issues invoices without a due date.
    pub invoice_due: Option<Duration>,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: TaxRate::STANDARD,
            cancellation_cutoff: Duration::zero(),
            invoice_due: None,
        }
    }
}

impl BookingPolicy {
    pub fn with_tax_rate(mut self, tax_rate: TaxRate) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn with_cancellation_cutoff(mut self, cutoff: Duration) -> Self {
        self.cancellation_cutoff = cutoff;
        self
    }

    pub fn with_invoice_due(mut self, due: Option<Duration>) -> Self {
        self.invoice_due = due;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_keeps_cancellation_open_until_start() {
        let policy = BookingPolicy::default();
        assert_eq!(policy.tax_rate, TaxRate::STANDARD);
        assert_eq!(policy.cancellation_cutoff, Duration::zero());
        assert!(policy.invoice_due.is_none());
    }

    #[test]
    fn builder_overrides() {
        let policy = BookingPolicy::default()
            .with_tax_rate(TaxRate::from_basis_points(700))
            .with_cancellation_cutoff(Duration::hours(24))
            .with_invoice_due(Some(Duration::days(30)));
        assert_eq!(policy.tax_rate.basis_points(), 700);
        assert_eq!(policy.cancellation_cutoff, Duration::hours(24));
        assert_eq!(policy.invoice_due, Some(Duration::days(30)));
    }
}
