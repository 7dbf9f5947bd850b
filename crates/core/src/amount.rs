//! Fixed-point coin amounts.
//!
//! Values are kept as an integer count of micro-units (6 fractional digits).
//! Floating point is avoided entirely: every replica must compute bit-identical
//! sums and differences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional decimal digits an amount carries.
pub const DECIMALS: u32 = 6;

/// Micro-units per whole coin.
pub const UNITS_PER_COIN: u64 = 10u64.pow(DECIMALS);

/// Errors produced when parsing an amount from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must not be negative")]
    Negative,

    #[error("amount has an unexpected character: {0:?}")]
    InvalidCharacter(char),

    #[error("amount has more than 6 fractional digits")]
    TooPrecise,

    #[error("amount is malformed")]
    Malformed,

    #[error("amount is too large")]
    Overflow,
}

/// A non-negative coin value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Build an amount from raw micro-units.
    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Build an amount from a whole number of coins, or `None` on overflow.
    pub fn from_coins(coins: u64) -> Option<Self> {
        coins.checked_mul(UNITS_PER_COIN).map(Self)
    }

    /// Raw micro-units.
    pub const fn units(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Sum a sequence of amounts, returning `None` if the total overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if s.starts_with('-') {
            return Err(AmountError::Negative);
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
            return Err(AmountError::InvalidCharacter(c));
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };
        if whole.is_empty() || fraction.contains('.') || (s.contains('.') && fraction.is_empty()) {
            return Err(AmountError::Malformed);
        }
        if fraction.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise);
        }

        let whole: u64 = whole.parse().map_err(|_| AmountError::Overflow)?;
        let mut fraction_units: u64 = 0;
        if !fraction.is_empty() {
            // Right-pad to DECIMALS digits: "5" -> 500000
            let scale = 10u64.pow(DECIMALS - fraction.len() as u32);
            fraction_units = fraction.parse::<u64>().map_err(|_| AmountError::Malformed)? * scale;
        }

        whole
            .checked_mul(UNITS_PER_COIN)
            .and_then(|units| units.checked_add(fraction_units))
            .map(Self)
            .ok_or(AmountError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNITS_PER_COIN;
        let fraction = self.0 % UNITS_PER_COIN;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", fraction, width = DECIMALS as usize);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}
