//! Fixed-point money.
//!
//! All monetary values in the service are exact base-10 decimals with two
//! fractional digits. Binary floating point is never used for prices.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits carried by every [`Money`] value.
pub const MONEY_SCALE: u32 = 2;

/// Errors produced when constructing or combining money amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The input was not a decimal number.
    #[error("invalid price format '{0}'")]
    InvalidFormat(String),

    /// Prices cannot be negative.
    #[error("negative price '{0}'")]
    Negative(String),

    /// The result does not fit in the decimal range.
    #[error("money arithmetic overflow")]
    Overflow,
}

/// An exact, non-floating monetary amount with two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Returns zero money.
    pub fn zero() -> Self {
        Self(normalize(Decimal::ZERO))
    }

    /// Creates a money amount from a whole number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    /// Creates a money amount from an arbitrary decimal, rounding half away
    /// from zero to two places.
    pub fn from_decimal(value: Decimal) -> Self {
        Self(normalize(value))
    }

    /// Parses a decimal price string such as `"19.99"`.
    ///
    /// More than two fractional digits are rounded half away from zero.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| MoneyError::InvalidFormat(input.to_string()))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative(input.to_string()));
        }
        Ok(Self::from_decimal(value))
    }

    /// Returns the underlying decimal (always scale 2).
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiplies by a quantity.
    ///
    /// A two-place amount times an integer is still two-place, so the
    /// product is exact.
    pub fn times(&self, quantity: u32) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self::from_decimal)
            .ok_or(MoneyError::Overflow)
    }

    /// Adds another amount, failing instead of overflowing.
    pub fn checked_add(&self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self::from_decimal)
            .ok_or(MoneyError::Overflow)
    }
}

fn normalize(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money::from_decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}
