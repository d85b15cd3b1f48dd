//! Stateless vault arithmetic.
//!
//! Collateral and debt are integer base units. Ratios are basis points of
//! collateral value over debt (`15_000` is 150%). Products are formed in
//! 512-bit integers, so comparisons are exact and never overflow; only a
//! result that does not fit back into `u128` is an error.

use primitive_types::{U256, U512};

use crate::error::{Result, VaultError};
use crate::price::Price;

/// One hundred percent, in basis points.
pub const BPS: u128 = 10_000;

/// Check a minimum collateral ratio. Anything below 100% is meaningless.
pub fn validate_ratio(min_ratio_bps: u128) -> Result<()> {
    if min_ratio_bps < BPS {
        return Err(VaultError::InvalidRatio(min_ratio_bps));
    }
    Ok(())
}

/// Value of `collateral` in debt units, rounded down.
pub fn collateral_value(collateral: u128, price: Price) -> Result<u128> {
    let value = U512::from(collateral) * U512::from(price.numerator())
        / U512::from(price.denominator());
    to_u128(value)
}

/// Collateral value over debt, in basis points, rounded down.
///
/// `None` when there is no debt.
pub fn collateral_ratio_bps(collateral: u128, debt: u128, price: Price) -> Result<Option<u128>> {
    if debt == 0 {
        return Ok(None);
    }
    let scaled_value =
        U512::from(collateral) * U512::from(price.numerator()) * U512::from(BPS);
    let scaled_debt = U512::from(debt) * U512::from(price.denominator());
    to_u128(scaled_value / scaled_debt).map(Some)
}

/// Whether the position meets `min_ratio_bps`.
///
/// Compares `collateral * price * 10000 >= min_ratio * debt` without
/// dividing. A position without debt is always healthy.
pub fn is_healthy(collateral: u128, debt: u128, price: Price, min_ratio_bps: u128) -> Result<bool> {
    validate_ratio(min_ratio_bps)?;
    if debt == 0 {
        return Ok(true);
    }
    let lhs = U512::from(collateral) * U512::from(price.numerator()) * U512::from(BPS);
    let rhs = U512::from(min_ratio_bps) * U512::from(debt) * U512::from(price.denominator());
    Ok(lhs >= rhs)
}

/// Collateral price at which the position sits exactly at `min_ratio_bps`.
///
/// Any price strictly below it makes the position unhealthy. `None` when
/// there is no debt, or no collateral to liquidate.
pub fn liquidation_price(collateral: u128, debt: u128, min_ratio_bps: u128) -> Result<Option<Price>> {
    validate_ratio(min_ratio_bps)?;
    if debt == 0 || collateral == 0 {
        return Ok(None);
    }
    let numerator = U256::from(min_ratio_bps) * U256::from(debt);
    let denominator = U256::from(collateral) * U256::from(BPS);
    let divisor = gcd(numerator, denominator);
    let numerator = to_u128(U512::from(numerator / divisor))?;
    let denominator = to_u128(U512::from(denominator / divisor))?;
    Price::new(numerator, denominator).map(Some)
}

/// Additional debt that can be minted while staying at or above
/// `min_ratio_bps`. Zero when the position is already at or past the limit.
///
/// A debt ceiling beyond `u128::MAX` is clamped to it.
pub fn max_mintable(collateral: u128, debt: u128, price: Price, min_ratio_bps: u128) -> Result<u128> {
    validate_ratio(min_ratio_bps)?;
    let scaled_value = U512::from(collateral) * U512::from(price.numerator()) * U512::from(BPS);
    let scaled_ratio = U512::from(min_ratio_bps) * U512::from(price.denominator());
    let ceiling = (scaled_value / scaled_ratio).min(U512::from(u128::MAX));
    Ok(ceiling.low_u128().saturating_sub(debt))
}

fn gcd(mut a: U256, mut b: U256) -> U256 {
    while !b.is_zero() {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

fn to_u128(value: U512) -> Result<u128> {
    if value > U512::from(u128::MAX) {
        return Err(VaultError::Overflow);
    }
    Ok(value.low_u128())
}
