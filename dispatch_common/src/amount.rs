use std::{fmt::Display, iter::Sum, ops::Mul};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// West African CFA franc. The franc has no minor unit, so amounts are whole francs.
pub const DEFAULT_CURRENCY: &str = "XOF";

//--------------------------------------       Amount        ---------------------------------------------------------
/// A monetary amount in the smallest unit of the mission currency.
///
/// Amounts are always integers. Anything derived from a percentage or a distance is rounded to the nearest unit
/// (half away from zero) at the point it becomes an `Amount`.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Mul<i64> for Amount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, a| acc + a)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Amount {
    type Error = AmountConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| AmountConversionError(format!("{value} is too large")))
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountConversionError;

    /// Rounds to the nearest whole unit. NaN, infinities and out-of-range values are rejected.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let rounded = value.round();
        if !rounded.is_finite() || rounded > i64::MAX as f64 || rounded < i64::MIN as f64 {
            return Err(AmountConversionError(format!("{value} is not a finite amount")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(rounded as i64))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {DEFAULT_CURRENCY}", self.0)
    }
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `percent`% of this amount, rounded to the nearest unit.
    pub fn percent(&self, percent: f64) -> Amount {
        #[allow(clippy::cast_precision_loss)]
        let raw = self.0 as f64 * percent / 100.0;
        Amount::try_from(raw).unwrap_or(Amount::ZERO)
    }

    /// Subtracts `rhs`, but never goes below zero.
    pub fn saturating_sub_floor(self, rhs: Amount) -> Amount {
        Amount((self.0 - rhs.0).max(0))
    }
}
