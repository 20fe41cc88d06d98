//! Fixed-point share arithmetic.
//!
//! Asset amounts and shares are whole base units held in `u128`. Conversions
//! between them go through an exact multiply-then-divide, widened to 256 bits
//! for the intermediate product, with an explicit rounding direction, so
//! callers decide which side of a conversion absorbs the remainder. Both
//! pools and both directions add the same virtual offsets to their totals
//! before computing a share price.

use alloy_primitives::U256;
use rust_decimal::Decimal;

/// Virtual shares added to a pool's share supply before any conversion.
pub const VIRTUAL_SHARES: u128 = 1_000_000;

/// Virtual assets added to a pool's asset total before any conversion.
pub const VIRTUAL_ASSETS: u128 = 1;

/// Oracle prices and ratios enter integer math as 18-decimal fixed point.
pub const ORACLE_PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

const SCALE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// x * y / d over 256 bits. The product of two u128 values always fits, so
/// only the final narrowing can overflow.
pub fn mul_div(x: u128, y: u128, d: u128, rounding: Rounding) -> Result<u128, MathError> {
    let wide = wide_mul_div(U256::from(x), U256::from(y), U256::from(d), rounding)?;
    narrow(wide)
}

/// floor(x * y / d)
pub fn mul_div_down(x: u128, y: u128, d: u128) -> Result<u128, MathError> {
    mul_div(x, y, d, Rounding::Down)
}

/// ceil(x * y / d)
pub fn mul_div_up(x: u128, y: u128, d: u128) -> Result<u128, MathError> {
    mul_div(x, y, d, Rounding::Up)
}

pub fn wide_mul_div(x: U256, y: U256, d: U256, rounding: Rounding) -> Result<U256, MathError> {
    if d.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = x.checked_mul(y).ok_or(MathError::Overflow)?;
    let quotient = product / d;
    match rounding {
        Rounding::Up if !(product % d).is_zero() => Ok(quotient + U256::from(1u8)),
        _ => Ok(quotient),
    }
}

pub fn narrow(value: U256) -> Result<u128, MathError> {
    u128::try_from(value).map_err(|_| MathError::Overflow)
}

/// A non-negative decimal as an integer scaled by `ORACLE_PRICE_SCALE`.
/// Digits past the 18th decimal are dropped or rounded up per `rounding`.
pub fn scale_decimal(value: Decimal, rounding: Rounding) -> Result<U256, MathError> {
    // negative mantissas fail the conversion
    let mantissa = u128::try_from(value.mantissa()).map_err(|_| MathError::Overflow)?;
    let scale = value.scale();
    if scale <= SCALE_DECIMALS {
        let factor = 10u128.pow(SCALE_DECIMALS - scale);
        U256::from(mantissa)
            .checked_mul(U256::from(factor))
            .ok_or(MathError::Overflow)
    } else {
        let divisor = 10u128.pow(scale - SCALE_DECIMALS);
        wide_mul_div(U256::from(mantissa), U256::from(1u8), U256::from(divisor), rounding)
    }
}

/// Inverse of `scale_decimal` for display and ratio metrics. `None` when the
/// value is past what `Decimal` can hold.
pub fn unscale_decimal(value: U256) -> Option<Decimal> {
    let mantissa = i128::try_from(value).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, SCALE_DECIMALS).ok()
}

/// a / b as an 18-decimal `Decimal`, rounded down. `None` for a zero divisor or
/// a ratio too large to represent.
pub fn ratio(a: U256, b: U256) -> Option<Decimal> {
    let scaled = wide_mul_div(a, U256::from(ORACLE_PRICE_SCALE), b, Rounding::Down).ok()?;
    unscale_decimal(scaled)
}

/// shares = assets * (total_shares + VIRTUAL_SHARES) / (total_assets + VIRTUAL_ASSETS)
pub fn to_shares(
    assets: u128,
    total_assets: u128,
    total_shares: u128,
    rounding: Rounding,
) -> Result<u128, MathError> {
    let shares_base = total_shares.checked_add(VIRTUAL_SHARES).ok_or(MathError::Overflow)?;
    let assets_base = total_assets.checked_add(VIRTUAL_ASSETS).ok_or(MathError::Overflow)?;
    mul_div(assets, shares_base, assets_base, rounding)
}

/// assets = shares * (total_assets + VIRTUAL_ASSETS) / (total_shares + VIRTUAL_SHARES)
pub fn to_assets(
    shares: u128,
    total_assets: u128,
    total_shares: u128,
    rounding: Rounding,
) -> Result<u128, MathError> {
    let assets_base = total_assets.checked_add(VIRTUAL_ASSETS).ok_or(MathError::Overflow)?;
    let shares_base = total_shares.checked_add(VIRTUAL_SHARES).ok_or(MathError::Overflow)?;
    mul_div(shares, assets_base, shares_base, rounding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_rounding() {
        assert_eq!(mul_div_down(10, 3, 4).unwrap(), 7); // 7.5
        assert_eq!(mul_div_up(10, 3, 4).unwrap(), 8);
        assert_eq!(mul_div_down(8, 3, 4).unwrap(), 6);
        assert_eq!(mul_div_up(8, 3, 4).unwrap(), 6); // exact, no bump
    }

    #[test]
    fn mul_div_errors() {
        assert_eq!(mul_div_down(1, 1, 0), Err(MathError::DivisionByZero));
        assert_eq!(mul_div_up(u128::MAX, 2, 1), Err(MathError::Overflow));
    }

    #[test]
    fn mul_div_at_token_scale() {
        // 1e30 assets hold 1e36 shares; the intermediate product is 1e66
        let assets = 10u128.pow(30);
        let shares = assets * VIRTUAL_SHARES;
        assert_eq!(mul_div_down(shares, assets + 1, shares + VIRTUAL_SHARES).unwrap(), assets);

        let odd = 10u128.pow(36) + 7;
        assert_eq!(mul_div_down(odd, odd, odd).unwrap(), odd);
        assert_eq!(mul_div_up(odd, 3, 2).unwrap(), (odd * 3).div_ceil(2));
    }

    #[test]
    fn share_round_trip_at_eighteen_decimals() {
        let supplied = 10 * 10u128.pow(18);
        let shares = to_shares(supplied, 0, 0, Rounding::Down).unwrap();
        let assets = to_assets(shares, supplied, shares, Rounding::Down).unwrap();
        assert_eq!(assets, supplied);
    }

    #[test]
    fn decimal_scaling() {
        use rust_decimal_macros::dec;

        assert_eq!(scale_decimal(dec!(1), Rounding::Down).unwrap(), U256::from(ORACLE_PRICE_SCALE));
        assert_eq!(
            scale_decimal(dec!(0.25), Rounding::Down).unwrap(),
            U256::from(ORACLE_PRICE_SCALE / 4)
        );
        // 20 decimals: the tail is dropped or bumped
        let fine = dec!(0.00000000000000000015);
        assert_eq!(scale_decimal(fine, Rounding::Down).unwrap(), U256::from(0u8));
        assert_eq!(scale_decimal(fine, Rounding::Up).unwrap(), U256::from(1u8));
        assert_eq!(scale_decimal(dec!(-1), Rounding::Down), Err(MathError::Overflow));

        assert_eq!(unscale_decimal(U256::from(ORACLE_PRICE_SCALE / 2)), Some(dec!(0.5)));
        assert_eq!(ratio(U256::from(3u8), U256::from(4u8)), Some(dec!(0.75)));
        assert_eq!(ratio(U256::from(3u8), U256::ZERO), None);
        assert_eq!(ratio(U256::MAX, U256::from(1u8)), None);
    }

    #[test]
    fn empty_pool_uses_virtual_price() {
        // first deposit: 1 asset buys VIRTUAL_SHARES / VIRTUAL_ASSETS shares
        let shares = to_shares(1_000, 0, 0, Rounding::Down).unwrap();
        assert_eq!(shares, 1_000 * VIRTUAL_SHARES);

        let assets = to_assets(shares, 1_000, shares, Rounding::Down).unwrap();
        assert_eq!(assets, 1_000);
    }

    #[test]
    fn rounding_direction_matters_on_uneven_pool() {
        // 1000 assets backing 999e6 shares: price is not a round number
        let total_assets = 1_000;
        let total_shares = 999 * VIRTUAL_SHARES;

        let down = to_shares(7, total_assets, total_shares, Rounding::Down).unwrap();
        let up = to_shares(7, total_assets, total_shares, Rounding::Up).unwrap();
        assert_eq!(up, down + 1);

        let back = to_assets(down, total_assets, total_shares, Rounding::Down).unwrap();
        assert!(back <= 7);
    }

    #[test]
    fn donation_does_not_zero_out_next_depositor() {
        // an attacker holding one share donates a large amount to the pool
        let total_shares = 1;
        let total_assets = 1_000_000;

        let shares = to_shares(1_000, total_assets, total_shares, Rounding::Down).unwrap();
        assert!(shares > 0);
    }
}
