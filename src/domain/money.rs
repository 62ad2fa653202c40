use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// A non-negative monetary value with two decimal places of interest.
///
/// Wrapper around `rust_decimal::Decimal` so that prices, budgets and payout
/// amounts cannot silently go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::Validation(format!(
                "monetary amount must be non-negative, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Splits this amount into (commission, merchant remainder) at `rate`.
    ///
    /// The commission is rounded to cents and capped at the gross, so the
    /// remainder can never go negative; the merchant side absorbs the
    /// rounding remainder and the two parts always sum back to the gross.
    pub fn split_commission(self, rate: Decimal) -> (Money, Money) {
        let commission = (self.0 * rate).round_dp(2).min(self.0);
        (Self(commission), Self(self.0 - commission))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
