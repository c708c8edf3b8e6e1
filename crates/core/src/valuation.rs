//! Collateral requirement and payout valuation.
//!
//! All quantities share `SCALE = 10^18`. Payouts truncate; put collateral rounds up.
//!
//! | option | collateral                 | intrinsic (`per_unit`)  | payout                       |
//! |--------|----------------------------|-------------------------|------------------------------|
//! | put    | `amount × strike` (strike) | `max(0, strike - spot)` | `amount × per_unit` (strike) |
//! | call   | `amount` (underlying)      | `max(0, spot - strike)` | `amount × per_unit / spot`   |
//!
//! The put payout stays strike-denominated while the call payout is converted
//! back into underlying units at the current spot price.

use thiserror::Error;

use crate::fixed_point::{ArithmeticError, FixedPoint};
use crate::terms::ContractTerms;
use crate::types::{OptionType, UnderlyingAssetType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuationError {
    #[error("valuation overflow")]
    Overflow,

    #[error("valuation divided by a zero price")]
    DivisionByZero,

    #[error("call collateral requires an addressable underlying")]
    UnsupportedAssetType,
}

impl From<ArithmeticError> for ValuationError {
    fn from(err: ArithmeticError) -> Self {
        match err {
            ArithmeticError::DivisionByZero => Self::DivisionByZero,
            _ => Self::Overflow,
        }
    }
}

/// Collateral, in the contract's collateral asset, backing `amount` claims.
///
/// Put collateral rounds up, so collateral posted across several writes always covers
/// the truncated payout on their combined amount.
///
/// # Errors
///
/// `Overflow` if the requirement does not fit, `UnsupportedAssetType` for a call
/// on a non-addressable underlying.
pub fn collateral_amount(
    terms: &ContractTerms,
    amount: FixedPoint,
) -> Result<FixedPoint, ValuationError> {
    match terms.option_type() {
        OptionType::Put => Ok(amount.checked_mul_ceil(terms.strike_price())?),
        OptionType::Call => match terms.underlying_asset_type() {
            UnderlyingAssetType::Addressable => Ok(amount),
            UnderlyingAssetType::NonAddressable => Err(ValuationError::UnsupportedAssetType),
        },
    }
}

/// Strike-denominated intrinsic value of one unit at `price`, clamped at zero.
#[must_use]
pub fn intrinsic_value(terms: &ContractTerms, price: FixedPoint) -> FixedPoint {
    let strike = terms.strike_price();
    match terms.option_type() {
        OptionType::Put => strike.saturating_sub(price),
        OptionType::Call => price.saturating_sub(strike),
    }
}

/// Payout, in the collateral asset, for exercising `amount` claims at `price`.
///
/// # Errors
///
/// `Overflow` on any intermediate overflow, `DivisionByZero` for an in-the-money
/// call valued at a zero price.
pub fn payout_value(
    terms: &ContractTerms,
    price: FixedPoint,
    amount: FixedPoint,
) -> Result<FixedPoint, ValuationError> {
    let per_unit = intrinsic_value(terms, price);
    if per_unit.is_zero() {
        return Ok(FixedPoint::ZERO);
    }
    match terms.option_type() {
        OptionType::Put => Ok(amount.checked_mul(per_unit)?),
        OptionType::Call => {
            let per_unit_underlying = per_unit.checked_div(price)?;
            Ok(amount.checked_mul(per_unit_underlying)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::TermsParams;
    use crate::types::{AssetId, ExerciseType};
    use chrono::{Duration, TimeZone, Utc};

    fn terms(option_type: OptionType, strike: u64) -> ContractTerms {
        terms_at_strike(option_type, FixedPoint::from_units(strike))
    }

    fn terms_at_strike(option_type: OptionType, strike_price: FixedPoint) -> ContractTerms {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ContractTerms::new(
            TermsParams {
                underlying_asset: AssetId::new("WETH"),
                strike_asset: AssetId::new("USDC"),
                option_type,
                exercise_type: ExerciseType::European,
                underlying_asset_type: UnderlyingAssetType::Addressable,
                strike_price,
                expiry: created_at + Duration::days(30),
                window_duration: Some(Duration::days(1)),
            },
            created_at,
        )
        .unwrap()
    }

    fn fp(s: &str) -> FixedPoint {
        s.parse().unwrap()
    }

    #[test]
    fn put_scenario() {
        let terms = terms(OptionType::Put, 1800);
        let amount = FixedPoint::from_units(5);
        assert_eq!(
            collateral_amount(&terms, amount).unwrap(),
            FixedPoint::from_units(9000)
        );

        let price = FixedPoint::from_units(1500);
        assert_eq!(intrinsic_value(&terms, price), FixedPoint::from_units(300));
        assert_eq!(
            payout_value(&terms, price, amount).unwrap(),
            FixedPoint::from_units(1500)
        );
    }

    #[test]
    fn call_scenario() {
        let terms = terms(OptionType::Call, 1200);
        let amount = FixedPoint::from_units(3);
        assert_eq!(collateral_amount(&terms, amount).unwrap(), amount);

        let price = FixedPoint::from_units(1500);
        assert_eq!(intrinsic_value(&terms, price), FixedPoint::from_units(300));
        assert_eq!(payout_value(&terms, price, amount).unwrap(), fp("0.6"));
    }

    #[test]
    fn at_the_money_pays_nothing() {
        for option_type in [OptionType::Put, OptionType::Call] {
            let terms = terms(option_type, 1800);
            let payout = payout_value(
                &terms,
                FixedPoint::from_units(1800),
                FixedPoint::from_units(7),
            )
            .unwrap();
            assert_eq!(payout, FixedPoint::ZERO, "{option_type}");
        }
    }

    #[test]
    fn out_of_the_money_clamps_to_zero() {
        let put = terms(OptionType::Put, 1800);
        assert_eq!(
            intrinsic_value(&put, FixedPoint::from_units(2500)),
            FixedPoint::ZERO
        );
        let call = terms(OptionType::Call, 1800);
        assert_eq!(
            intrinsic_value(&call, FixedPoint::from_units(100)),
            FixedPoint::ZERO
        );
        assert_eq!(
            payout_value(&call, FixedPoint::ZERO, FixedPoint::ONE).unwrap(),
            FixedPoint::ZERO
        );
    }

    #[test]
    fn put_collateral_is_monotonic_and_zero_at_zero() {
        let terms = terms(OptionType::Put, 1800);
        assert_eq!(
            collateral_amount(&terms, FixedPoint::ZERO).unwrap(),
            FixedPoint::ZERO
        );

        let mut previous = FixedPoint::ZERO;
        for raw in [1u128, 7, 1_000, 999_999_999_999_999_999, 10u128.pow(18), 10u128.pow(24)] {
            let collateral = collateral_amount(&terms, FixedPoint::from_raw(raw)).unwrap();
            assert!(collateral >= previous);
            previous = collateral;
        }
    }

    #[test]
    fn put_payout_never_exceeds_collateral() {
        let terms = terms(OptionType::Put, 1800);
        let amount = fp("12.345");
        let collateral = collateral_amount(&terms, amount).unwrap();
        for price in ["0", "0.5", "1799.99", "1800", "9000"] {
            assert!(payout_value(&terms, fp(price), amount).unwrap() <= collateral);
        }
    }

    #[test]
    fn call_payout_never_exceeds_collateral() {
        let terms = terms(OptionType::Call, 1200);
        let amount = fp("3");
        for price in ["1200.000000000000000001", "1500", "1000000"] {
            assert!(payout_value(&terms, fp(price), amount).unwrap() <= amount);
        }
    }

    #[test]
    fn split_put_collateral_covers_combined_payout() {
        let terms = terms_at_strike(OptionType::Put, fp("1.9"));
        let dust = FixedPoint::from_raw(1);

        let mut posted = FixedPoint::ZERO;
        for _ in 0..10 {
            posted = posted
                .checked_add(collateral_amount(&terms, dust).unwrap())
                .unwrap();
        }
        let combined = FixedPoint::from_raw(10);
        assert_eq!(posted.raw(), 20);

        for price in ["0", "0.1", "1", "1.899999999999999999"] {
            let payout = payout_value(&terms, fp(price), combined).unwrap();
            assert!(payout <= posted, "price {price}: {payout} > {posted}");
        }
    }

    #[test]
    fn overflow_is_reported() {
        let terms = terms(OptionType::Put, 1800);
        assert_eq!(
            collateral_amount(&terms, FixedPoint::from_raw(u128::MAX)),
            Err(ValuationError::Overflow)
        );
    }
}
