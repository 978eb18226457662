//! Money amounts.

use serde::{Deserialize, Serialize};

/// Money amount in whole rupiah (IDR has no minor unit in practice, and the
/// payment gateway takes integer gross amounts).
///
/// The operators saturate instead of overflowing. Code that must reject an
/// overflowing amount uses the `checked_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a money amount.
    pub fn from_amount(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw amount.
    pub fn amount(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, saturating at the bounds of `i64`.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IDR {}", self.0)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let latte = Money::from_amount(28_000);
        assert_eq!(latte.multiply(3).amount(), 84_000);
        assert_eq!((latte + Money::from_amount(2_000)).amount(), 30_000);

        let mut total = Money::zero();
        total += latte;
        assert_eq!(total, latte);
    }

    #[test]
    fn sums_over_iterators() {
        let total: Money = [10_000, 15_000, 5_000]
            .into_iter()
            .map(Money::from_amount)
            .sum();
        assert_eq!(total.amount(), 30_000);
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let huge = Money::from_amount(i64::MAX / 2 + 1);
        assert_eq!(huge.checked_multiply(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(
            Money::from_amount(25_000).checked_multiply(4),
            Some(Money::from_amount(100_000))
        );
        assert_eq!(
            Money::from_amount(1).checked_add(Money::from_amount(2)),
            Some(Money::from_amount(3))
        );
    }

    #[test]
    fn operators_saturate() {
        let huge = Money::from_amount(i64::MAX / 2 + 1);
        assert_eq!(huge.multiply(2).amount(), i64::MAX);
        assert_eq!((huge + huge).amount(), i64::MAX);
        let total: Money = [huge, huge, huge].into_iter().sum();
        assert_eq!(total.amount(), i64::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(Money::from_amount(25_000).to_string(), "IDR 25000");
    }

    #[test]
    fn sign_checks() {
        assert!(Money::from_amount(1).is_positive());
        assert!(!Money::zero().is_positive());
        assert!(Money::from_amount(-1).is_negative());
    }
}
