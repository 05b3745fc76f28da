//! Money helpers with precise decimal arithmetic
//!
//! Every balance, posting and voucher amount in the system is a
//! `rust_decimal::Decimal`. Floating point never touches a ledger value, so
//! thousands of postings replay to the exact same balance.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of decimal places reported on statements
pub const MONEY_SCALE: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be greater than zero, got {0}")]
    NonPositive(Decimal),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// Rounds a value to statement precision (half away from zero)
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Adds two amounts, reporting overflow instead of panicking
pub fn checked_sum(a: Decimal, b: Decimal) -> Result<Decimal, MoneyError> {
    a.checked_add(b).ok_or(MoneyError::Overflow)
}

/// Sums an iterator of amounts with overflow detection
pub fn checked_total<I>(amounts: I) -> Result<Decimal, MoneyError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| checked_sum(acc, amount))
}

/// An amount that is strictly greater than zero
///
/// Postings, fund movements and voucher merges only accept positive
/// amounts; the direction of the movement is carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct PositiveAmount(Decimal);

impl PositiveAmount {
    /// Validates that `amount` is strictly positive
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount <= Decimal::ZERO {
            return Err(MoneyError::NonPositive(amount));
        }
        Ok(Self(amount))
    }

    /// Returns the underlying decimal
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for PositiveAmount {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PositiveAmount> for Decimal {
    fn from(amount: PositiveAmount) -> Decimal {
        amount.0
    }
}

impl fmt::Display for PositiveAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Whether a movement adds to or takes from a balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    /// Applies the direction's sign to an unsigned amount
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Direction::Inflow => amount,
            Direction::Outflow => -amount,
        }
    }

    /// Returns the opposite direction
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Inflow => Direction::Outflow,
            Direction::Outflow => Direction::Inflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_amount_rejects_zero_and_negative() {
        assert_eq!(PositiveAmount::new(dec!(0)), Err(MoneyError::NonPositive(dec!(0))));
        assert_eq!(PositiveAmount::new(dec!(-5)), Err(MoneyError::NonPositive(dec!(-5))));
        assert_eq!(PositiveAmount::new(dec!(0.01)).unwrap().value(), dec!(0.01));
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn test_direction_signed() {
        assert_eq!(Direction::Inflow.signed(dec!(5)), dec!(5));
        assert_eq!(Direction::Outflow.signed(dec!(5)), dec!(-5));
        assert_eq!(Direction::Inflow.opposite(), Direction::Outflow);
    }

    #[test]
    fn test_checked_sum_overflow() {
        assert_eq!(checked_sum(Decimal::MAX, dec!(1)), Err(MoneyError::Overflow));
        assert_eq!(checked_total(vec![dec!(1.10), dec!(2.20)]), Ok(dec!(3.30)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn checked_total_matches_minor_unit_sum(
            minors in proptest::collection::vec(-1_000_000i64..1_000_000i64, 0..200)
        ) {
            let amounts: Vec<Decimal> = minors.iter().map(|m| Decimal::new(*m, 2)).collect();
            let expected = Decimal::new(minors.iter().sum::<i64>(), 2);
            prop_assert_eq!(checked_total(amounts).unwrap(), expected);
        }
    }
}
