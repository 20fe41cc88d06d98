//! Position health.
//!
//! A position is healthy when the value of its debt is covered by the value of
//! its collateral scaled down by the market's LLTV. Debt is valued with the
//! borrow-share conversion rounded up, so a position can never look healthier
//! than the pool's own books say it is.

use crate::math::{self, MathError, Rounding};
use crate::position::Position;
use crate::shares::PoolTotals;
use crate::types::{Lltv, OraclePrice, WAD};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Values are asset amounts times an 18-decimal price, kept unscaled in 256
/// bits so no valuation rounds except through the price itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHealth {
    pub borrow_assets: u128,
    pub borrow_value: U256,
    pub collateral_value: U256,
    /// Collateral value times LLTV: the most debt value the position may carry.
    pub max_borrow_value: U256,
    pub healthy: bool,
}

impl PositionHealth {
    /// max_borrow_value / borrow_value; `None` when there is no debt.
    pub fn health_factor(&self) -> Option<Decimal> {
        math::ratio(self.max_borrow_value, self.borrow_value)
    }

    /// borrow_value / collateral_value; `None` when the collateral is worthless.
    pub fn ltv(&self) -> Option<Decimal> {
        math::ratio(self.borrow_value, self.collateral_value)
    }

    /// Debt value that could still be added before the position turns unhealthy.
    pub fn borrow_headroom(&self) -> U256 {
        self.max_borrow_value.saturating_sub(self.borrow_value)
    }
}

/// The health rule itself: zero debt is always healthy, debt against worthless
/// collateral never is, otherwise debt value must fit under collateral × LLTV.
pub fn is_healthy(borrow_value: U256, collateral_value: U256, max_borrow_value: U256) -> bool {
    borrow_value.is_zero() || (!collateral_value.is_zero() && borrow_value <= max_borrow_value)
}

pub fn evaluate(
    pool: &PoolTotals,
    position: &Position,
    lltv: Lltv,
    borrow_price: OraclePrice,
    collateral_price: OraclePrice,
) -> Result<PositionHealth, MathError> {
    let borrow_assets = pool.to_borrow_assets(position.borrow_shares, Rounding::Up)?;

    let borrow_value = value_of(borrow_assets, borrow_price, Rounding::Up)?;
    let collateral_value = value_of(position.collateral, collateral_price, Rounding::Down)?;
    let max_borrow_value = math::wide_mul_div(
        collateral_value,
        U256::from(lltv.to_wad()),
        U256::from(WAD),
        Rounding::Down,
    )?;

    Ok(PositionHealth {
        borrow_assets,
        borrow_value,
        collateral_value,
        max_borrow_value,
        healthy: is_healthy(borrow_value, collateral_value, max_borrow_value),
    })
}

/// amount × price at `ORACLE_PRICE_SCALE`. Debt is valued with the price
/// rounded up and collateral with it rounded down.
pub fn value_of(amount: u128, price: OraclePrice, rounding: Rounding) -> Result<U256, MathError> {
    math::scale_decimal(price.value(), rounding)?
        .checked_mul(U256::from(amount))
        .ok_or(MathError::Overflow)
}
