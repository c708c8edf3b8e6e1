//! Unsigned fixed-point numbers with 18 implied fractional digits.
//!
//! Every quantity the engine handles (claim amounts, collateral, strike and spot
//! prices, payouts) is a [`FixedPoint`]: an integer holding `value × SCALE`.
//! Products and quotients are computed in 256 bits so the intermediate never
//! wraps; only a final result that does not fit back into `u128` is an error.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Number of implied fractional digits.
pub const DECIMALS: u32 = 18;

/// `10^18`, the raw value of one whole unit.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Errors from fixed-point arithmetic and parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    /// Result does not fit in 128 bits.
    #[error("fixed-point overflow")]
    Overflow,

    /// Subtraction went below zero.
    #[error("fixed-point underflow")]
    Underflow,

    /// Divisor was zero.
    #[error("fixed-point division by zero")]
    DivisionByZero,

    /// Input carries more than 18 significant fractional digits.
    #[error("more than {DECIMALS} fractional digits: {0}")]
    Precision(String),

    /// Input is not a non-negative decimal number.
    #[error("invalid fixed-point value: {0}")]
    Invalid(String),
}

/// Non-negative fixed-point value, `raw / 10^18`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(into = "String")]
pub struct FixedPoint(u128);

impl FixedPoint {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(SCALE);

    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole units, e.g. `from_units(1800)` is `1800.0`.
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * SCALE)
    }

    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(ArithmeticError::Underflow)
    }

    /// `self - rhs`, clamped at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// `self × rhs / SCALE`, truncated.
    pub fn checked_mul(self, rhs: Self) -> Result<Self, ArithmeticError> {
        mul_div(self.0, rhs.0, SCALE, Rounding::Down).map(Self)
    }

    /// `self × rhs / SCALE`, rounded up to the next raw unit.
    pub fn checked_mul_ceil(self, rhs: Self) -> Result<Self, ArithmeticError> {
        mul_div(self.0, rhs.0, SCALE, Rounding::Up).map(Self)
    }

    /// `self × SCALE / rhs`, truncated.
    pub fn checked_div(self, rhs: Self) -> Result<Self, ArithmeticError> {
        mul_div(self.0, SCALE, rhs.0, Rounding::Down).map(Self)
    }

    /// Lossless conversion to a `Decimal`, if the value fits its 96-bit mantissa.
    #[must_use]
    pub fn to_decimal(self) -> Option<Decimal> {
        let raw = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(raw, DECIMALS)
            .ok()
            .map(|d| d.normalize())
    }

    /// Converts a non-negative `Decimal` carrying at most 18 fractional digits.
    pub fn from_decimal(value: Decimal) -> Result<Self, ArithmeticError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ArithmeticError::Invalid(value.to_string()));
        }
        let value = value.normalize();
        let scale = value.scale();
        if scale > DECIMALS {
            return Err(ArithmeticError::Precision(value.to_string()));
        }
        let mantissa = u128::try_from(value.mantissa())
            .map_err(|_| ArithmeticError::Invalid(value.to_string()))?;
        let factor = 10u128.pow(DECIMALS - scale);
        mantissa
            .checked_mul(factor)
            .map(Self)
            .ok_or(ArithmeticError::Overflow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rounding {
    Down,
    Up,
}

/// `a × b / d` with a 256-bit intermediate.
fn mul_div(a: u128, b: u128, d: u128, rounding: Rounding) -> Result<u128, ArithmeticError> {
    if d == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    let mut product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(ArithmeticError::Overflow)?;
    if rounding == Rounding::Up {
        product = product
            .checked_add(U256::from(d - 1))
            .ok_or(ArithmeticError::Overflow)?;
    }
    let quotient = product
        .checked_div(U256::from(d))
        .ok_or(ArithmeticError::DivisionByZero)?;
    u128::try_from(quotient).map_err(|_| ArithmeticError::Overflow)
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for FixedPoint {
    type Err = ArithmeticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim())
            .map_err(|_| ArithmeticError::Invalid(s.to_string()))?;
        Self::from_decimal(value)
    }
}

struct FixedPointVisitor;

impl Visitor<'_> for FixedPointVisitor {
    type Value = FixedPoint;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FixedPoint, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FixedPoint, E> {
        Ok(FixedPoint::from_units(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FixedPoint, E> {
        u64::try_from(v)
            .map(FixedPoint::from_units)
            .map_err(|_| E::custom(ArithmeticError::Invalid(v.to_string())))
    }

    // Environment overrides such as `STRIKE_PRICE=1800.5` arrive as floats.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FixedPoint, E> {
        let value = Decimal::try_from(v)
            .map_err(|_| E::custom(ArithmeticError::Invalid(v.to_string())))?;
        FixedPoint::from_decimal(value).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedPointVisitor)
    }
}

impl From<FixedPoint> for String {
    fn from(value: FixedPoint) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mul_keeps_scale() {
        let amount = FixedPoint::from_units(5);
        let strike = FixedPoint::from_units(1800);
        assert_eq!(amount.checked_mul(strike).unwrap(), FixedPoint::from_units(9000));
    }

    #[test]
    fn mul_does_not_wrap_on_large_intermediate() {
        // Raw product is ~10^47, past u128, but the rescaled result fits.
        let big = FixedPoint::from_raw(100 * SCALE);
        let product = big.checked_mul(FixedPoint::from_units(1_000_000_000)).unwrap();
        assert_eq!(product.raw(), 100_000_000_000 * SCALE);
    }

    #[test]
    fn mul_overflow_is_an_error() {
        let max = FixedPoint::from_raw(u128::MAX);
        assert_eq!(
            max.checked_mul(FixedPoint::from_units(2)),
            Err(ArithmeticError::Overflow)
        );
    }

    #[test]
    fn mul_ceil_rounds_remainder_up() {
        let strike: FixedPoint = "1.9".parse().unwrap();
        let dust = FixedPoint::from_raw(1);
        assert_eq!(dust.checked_mul(strike).unwrap().raw(), 1);
        assert_eq!(dust.checked_mul_ceil(strike).unwrap().raw(), 2);

        let exact = FixedPoint::from_units(5);
        assert_eq!(
            exact.checked_mul_ceil(strike).unwrap(),
            exact.checked_mul(strike).unwrap()
        );
        assert_eq!(
            FixedPoint::ZERO.checked_mul_ceil(strike).unwrap(),
            FixedPoint::ZERO
        );
    }

    #[test]
    fn div_truncates_and_rejects_zero() {
        let fifth = FixedPoint::from_units(300)
            .checked_div(FixedPoint::from_units(1500))
            .unwrap();
        assert_eq!(fifth, "0.2".parse().unwrap());

        let third = FixedPoint::ONE.checked_div(FixedPoint::from_units(3)).unwrap();
        assert_eq!(third.raw(), 333_333_333_333_333_333);

        assert_eq!(
            FixedPoint::ONE.checked_div(FixedPoint::ZERO),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn sub_underflow_vs_saturating() {
        let a = FixedPoint::from_units(1);
        let b = FixedPoint::from_units(2);
        assert_eq!(a.checked_sub(b), Err(ArithmeticError::Underflow));
        assert_eq!(a.saturating_sub(b), FixedPoint::ZERO);
    }

    #[test]
    fn parse_and_display() {
        let v: FixedPoint = "1800.25".parse().unwrap();
        assert_eq!(v.raw(), 1_800_250_000_000_000_000_000);
        assert_eq!(v.to_string(), "1800.25");
        assert_eq!(FixedPoint::from_units(42).to_string(), "42");
        assert_eq!(FixedPoint::from_raw(1).to_string(), "0.000000000000000001");
    }

    #[test]
    fn parse_rejects_negative_and_excess_precision() {
        assert!(matches!("-1".parse::<FixedPoint>(), Err(ArithmeticError::Invalid(_))));
        assert!(matches!(
            "0.0000000000000000001".parse::<FixedPoint>(),
            Err(ArithmeticError::Precision(_))
        ));
        assert!(matches!(
            "abc".parse::<FixedPoint>(),
            Err(ArithmeticError::Invalid(_))
        ));
    }

    #[test]
    fn decimal_conversion() {
        let v = FixedPoint::from_decimal(dec!(0.6)).unwrap();
        assert_eq!(v.raw(), 600_000_000_000_000_000);
        assert_eq!(v.to_decimal(), Some(dec!(0.6)));
    }

    #[test]
    fn serde_as_string() {
        let v: FixedPoint = "1.5".parse().unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.5\"");
        let back: FixedPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn deserializes_bare_numbers() {
        let whole: FixedPoint = serde_json::from_str("1800").unwrap();
        assert_eq!(whole, FixedPoint::from_units(1800));
        let frac: FixedPoint = serde_json::from_str("0.25").unwrap();
        assert_eq!(frac, "0.25".parse().unwrap());
        assert!(serde_json::from_str::<FixedPoint>("-1").is_err());
    }
}
