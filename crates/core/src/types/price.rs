//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices arrive as JSON numbers (`44`, `5.5`). They are held as
//! [`Decimal`] so cart totals are exact; floating point never enters a sum.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a [`Price`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative amount in the store currency.
///
/// `Display` renders the amount with exactly two decimal places, e.g. `$25.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// This price multiplied by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// The amount rounded half away from zero to two decimal places.
    #[must_use]
    pub fn rounded(self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.rounded())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        Price::new(s.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_negative_rejected() {
        let result = Price::new(Decimal::new(-1, 0));
        assert!(matches!(result, Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_zero_allowed() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [price("10").times(2), price("5.5").times(1)]
            .into_iter()
            .sum();
        assert_eq!(total.amount(), "25.5".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let total: Price = std::iter::empty().sum();
        assert_eq!(total, Price::ZERO);
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(price("25.5").to_string(), "$25.50");
        assert_eq!(price("44").to_string(), "$44.00");
        assert_eq!(price("0.125").to_string(), "$0.13");
        assert_eq!(Price::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_decimal_sums_are_exact() {
        // 0.1 + 0.2 drifts in f64; decimal arithmetic does not
        let total = price("0.1") + price("0.2");
        assert_eq!(total.amount(), "0.3".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_deserialize_from_json_number() {
        let parsed: Price = serde_json::from_str("5.5").unwrap();
        assert_eq!(parsed, price("5.5"));

        let parsed: Price = serde_json::from_str("44").unwrap();
        assert_eq!(parsed, price("44"));
    }

    #[test]
    fn test_deserialize_negative_fails() {
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(1999).to_string(), "$19.99");
    }
}
