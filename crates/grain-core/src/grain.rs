//! # Grain Amounts
//!
//! Fixed-point integer currency. One Grain is `10^GRAIN_DECIMALS` base units
//! and every operation works on base units, so nothing is ever rounded
//! through a floating-point value.
//!
//! Amounts are non-negative and of arbitrary precision. Subtraction is the
//! only operation that can fail.

use crate::{GrainError, primitives};
use num_bigint::BigUint;
use num_traits::{CheckedSub, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A non-negative amount of Grain, in base units.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GrainAmount(BigUint);

/// Base units in one whole Grain.
fn one_grain() -> BigUint {
    BigUint::from(10u32).pow(primitives::GRAIN_DECIMALS)
}

impl GrainAmount {
    /// The zero amount.
    #[must_use]
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    #[must_use]
    pub fn from_base_units(units: impl Into<BigUint>) -> Self {
        Self(units.into())
    }

    /// Amount equal to `grain` whole Grain.
    #[must_use]
    pub fn from_whole_grain(grain: u64) -> Self {
        Self(BigUint::from(grain) * one_grain())
    }

    #[must_use]
    pub fn base_units(&self) -> &BigUint {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtract `other`, failing instead of going below zero.
    pub fn try_sub(&self, other: &Self) -> Result<Self, GrainError> {
        self.0
            .checked_sub(&other.0)
            .map(Self)
            .ok_or_else(|| GrainError::GrainUnderflow {
                minuend: self.0.to_string(),
                subtrahend: other.0.to_string(),
            })
    }

    /// Render with exactly `decimals` fractional digits (truncating).
    ///
    /// No thousands separators; the output depends only on the amount.
    #[must_use]
    pub fn format(&self, decimals: u32) -> String {
        let one = one_grain();
        let whole = &self.0 / &one;
        if decimals == 0 {
            return whole.to_string();
        }
        let fraction = &self.0 % &one;
        let digits = format!(
            "{:0>width$}",
            fraction.to_string(),
            width = primitives::GRAIN_DECIMALS as usize
        );
        let shown = decimals.min(primitives::GRAIN_DECIMALS) as usize;
        let mut out = format!("{}.{}", whole, &digits[..shown]);
        for _ in primitives::GRAIN_DECIMALS..decimals {
            out.push('0');
        }
        out
    }

    /// Parse a Grain string such as `"12"` or `"0.25"`.
    ///
    /// At most `GRAIN_DECIMALS` fractional digits are accepted.
    pub fn parse(s: &str) -> Result<Self, GrainError> {
        let invalid = || GrainError::InvalidAmount(s.to_string());
        let (whole, fraction) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
            return Err(invalid());
        }
        if fraction.len() > primitives::GRAIN_DECIMALS as usize {
            return Err(invalid());
        }
        let whole: BigUint = whole.parse().map_err(|_| invalid())?;
        let padded = format!(
            "{:0<width$}",
            fraction,
            width = primitives::GRAIN_DECIMALS as usize
        );
        let fraction: BigUint = padded.parse().map_err(|_| invalid())?;
        Ok(Self(whole * one_grain() + fraction))
    }
}

impl fmt::Display for GrainAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.format(primitives::DISPLAY_DECIMALS))
    }
}

/// Parses a base-unit integer string.
impl FromStr for GrainAmount {
    type Err = GrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GrainError::InvalidAmount(s.to_string()));
        }
        s.parse::<BigUint>()
            .map(Self)
            .map_err(|_| GrainError::InvalidAmount(s.to_string()))
    }
}

impl Add for GrainAmount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Add<&GrainAmount> for &GrainAmount {
    type Output = GrainAmount;

    fn add(self, rhs: &GrainAmount) -> GrainAmount {
        GrainAmount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&GrainAmount> for GrainAmount {
    fn add_assign(&mut self, rhs: &GrainAmount) {
        self.0 += &rhs.0;
    }
}

impl<'a> Sum<&'a GrainAmount> for GrainAmount {
    fn sum<I: Iterator<Item = &'a GrainAmount>>(iter: I) -> Self {
        iter.fold(Self::zero(), |mut acc, x| {
            acc += x;
            acc
        })
    }
}

impl Sum for GrainAmount {
    fn sum<I: Iterator<Item = GrainAmount>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

// Base units as a decimal string: readable in JSON and exact everywhere.
impl Serialize for GrainAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for GrainAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_grain_is_scaled() {
        let one = GrainAmount::from_whole_grain(1);
        assert_eq!(one.base_units().to_string(), "1000000000000000000");
    }

    #[test]
    fn add_is_exact() {
        let a = GrainAmount::from_base_units(1u32);
        let b = GrainAmount::from_whole_grain(3);
        assert_eq!((&a + &b).base_units().to_string(), "3000000000000000001");
    }

    #[test]
    fn sub_underflow_is_an_error() {
        let small = GrainAmount::from_whole_grain(1);
        let big = GrainAmount::from_whole_grain(2);
        assert!(matches!(
            small.try_sub(&big),
            Err(GrainError::GrainUnderflow { .. })
        ));
        assert_eq!(big.try_sub(&small).expect("sub"), small);
    }

    #[test]
    fn format_truncates_fixed_places() {
        let amount = GrainAmount::parse("1234.5678").expect("parse");
        assert_eq!(amount.format(0), "1234");
        assert_eq!(amount.format(2), "1234.56");
        assert_eq!(amount.format(6), "1234.567800");
        assert_eq!(amount.to_string(), "1234.56");
        assert_eq!(GrainAmount::zero().format(3), "0.000");
    }

    #[test]
    fn format_beyond_precision_pads() {
        let amount = GrainAmount::from_base_units(1u32);
        assert_eq!(amount.format(20), "0.00000000000000000100");
    }

    #[test]
    fn parse_rejects_bad_input() {
        for bad in ["", "-1", "1.2.3", "abc", ".5", "1.0000000000000000001"] {
            assert!(GrainAmount::parse(bad).is_err(), "{bad} should fail");
        }
        assert_eq!(
            GrainAmount::parse("5.").expect("parse"),
            GrainAmount::from_whole_grain(5)
        );
    }

    #[test]
    fn sum_of_amounts() {
        let amounts = [
            GrainAmount::from_whole_grain(1),
            GrainAmount::from_whole_grain(2),
            GrainAmount::from_whole_grain(3),
        ];
        let total: GrainAmount = amounts.iter().sum();
        assert_eq!(total, GrainAmount::from_whole_grain(6));
    }

    #[test]
    fn json_uses_base_unit_strings() {
        let amount = GrainAmount::from_whole_grain(2);
        let json = serde_json::to_string(&amount).expect("serialize");
        assert_eq!(json, "\"2000000000000000000\"");
        let back: GrainAmount = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, amount);
    }
}
