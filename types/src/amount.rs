//! Ledger amount type.
//!
//! Amounts are fixed-point integers (u128 raw units) to avoid floating-point
//! errors. Overflow is surfaced as data (`None` from the `checked_*`
//! operations), never as a panic or an exception-like control path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// An amount of PAL, stored as raw units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by a count (e.g. per-transaction price × transaction count).
    pub fn checked_mul(self, count: u64) -> Option<Self> {
        self.0.checked_mul(count as u128).map(Self)
    }

    /// Integer percentage cut, rounded down.
    pub fn percent_floor(self, percent: u64) -> Option<Self> {
        self.0
            .checked_mul(percent as u128)
            .map(|v| Self(v / 100))
    }

    /// Divide evenly across `n` shares, returning (per-share, remainder).
    ///
    /// Returns `None` when `n` is zero.
    pub fn div_rem(self, n: u64) -> Option<(Self, Self)> {
        if n == 0 {
            return None;
        }
        let n = n as u128;
        Some((Self(self.0 / n), Self(self.0 % n)))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} PAL", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_overflow_is_none() {
        let max = Amount::new(u128::MAX);
        assert_eq!(max.checked_add(Amount::new(1)), None);
    }

    #[test]
    fn div_rem_splits_exactly() {
        let (per, rem) = Amount::new(91).div_rem(3).unwrap();
        assert_eq!(per, Amount::new(30));
        assert_eq!(rem, Amount::new(1));
    }

    #[test]
    fn div_rem_zero_shares_is_none() {
        assert!(Amount::new(100).div_rem(0).is_none());
    }

    #[test]
    fn percent_floor_rounds_down() {
        assert_eq!(Amount::new(101).percent_floor(10), Some(Amount::new(10)));
        assert_eq!(Amount::new(100).percent_floor(10), Some(Amount::new(10)));
        assert_eq!(Amount::new(99).percent_floor(10), Some(Amount::new(9)));
    }
}
