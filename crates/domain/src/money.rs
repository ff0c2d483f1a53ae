//! Money and tax value objects.

use serde::{Deserialize, Serialize};

/// Money amount held in minor units (cents) to avoid floating point drift.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates an amount from minor units.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates an amount from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Self {
            cents: units.saturating_mul(100),
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the minor-unit remainder after whole units.
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a seat count. `None` when the product does not fit.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Subtracts, flooring the result at zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money {
            cents: self.cents.saturating_sub(other.cents).max(0),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.units(), self.cents_part())
        }
    }
}

// Operators saturate at the i64 bounds. Totals that must be exact go through
// the checked methods.
impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_sub(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A tax rate in basis points (1/100 of a percent).
///
/// `TaxRate::from_basis_points(1900)` is 19 %.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Standard VAT rate applied to ticket sales.
    pub const STANDARD: TaxRate = TaxRate(1900);

    pub fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    pub fn basis_points(&self) -> u32 {
        self.0
    }

    /// Computes the tax owed on `amount`, rounding half away from zero.
    ///
    /// `None` when the tax does not fit in a `Money`.
    pub fn apply(&self, amount: Money) -> Option<Money> {
        let raw = i128::from(amount.cents()) * i128::from(self.0);
        let rounded = if raw >= 0 {
            (raw + 5_000) / 10_000
        } else {
            (raw - 5_000) / 10_000
        };
        i64::try_from(rounded).ok().map(Money::from_cents)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl std::fmt::Display for TaxRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_parts() {
        let money = Money::from_cents(1234);
        assert_eq!(money.units(), 12);
        assert_eq!(money.cents_part(), 34);
        assert_eq!(Money::from_units(50).cents(), 5000);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!(a.checked_multiply(3), Some(Money::from_cents(3000)));
        assert_eq!(b.saturating_sub(a), Money::zero());
    }

    #[test]
    fn money_sum() {
        let total: Money = [100, 200, 300].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 600);
    }

    #[test]
    fn standard_vat_is_nineteen_percent() {
        let tax = TaxRate::STANDARD.apply(Money::from_units(100)).unwrap();
        assert_eq!(tax.cents(), 1900);
        assert_eq!(TaxRate::STANDARD.to_string(), "19.00%");
    }

    #[test]
    fn tax_rounds_half_up() {
        // 19% of 0.05 = 0.0095 -> 0.01
        assert_eq!(TaxRate::STANDARD.apply(Money::from_cents(5)), Some(Money::from_cents(1)));
        // 19% of 0.02 = 0.0038 -> 0.00
        assert_eq!(TaxRate::STANDARD.apply(Money::from_cents(2)), Some(Money::zero()));
    }

    #[test]
    fn zero_rate_is_free() {
        let rate = TaxRate::from_basis_points(0);
        assert_eq!(rate.apply(Money::from_units(42)), Some(Money::zero()));
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_multiply(3), None);
        assert_eq!(huge.checked_multiply(2), Some(Money::from_cents(i64::MAX - 1)));
        assert_eq!(huge.checked_add(huge).unwrap().cents(), i64::MAX - 1);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!((Money::from_cents(i64::MAX) + Money::from_cents(1)).cents(), i64::MAX);
    }

    #[test]
    fn tax_too_large_is_none() {
        let rate = TaxRate::from_basis_points(u32::MAX);
        assert_eq!(rate.apply(Money::from_cents(i64::MAX)), None);
    }
}
