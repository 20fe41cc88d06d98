//! Liquidation sizing.
//!
//! A liquidator names how much collateral they are willing to take from an
//! unhealthy position. This module turns that request into the exact amounts:
//! collateral seized, debt assets repaid and debt shares burned. The repayment
//! is the value of the seized collateral divided by the liquidation incentive
//! factor (LIF), converted into the loan asset and capped at the outstanding
//! debt. When the cap binds the seizure shrinks to match, so a liquidator can
//! never take collateral beyond what the debt plus incentive is worth.

use crate::math::{self, MathError, Rounding, ORACLE_PRICE_SCALE};
use crate::position::Position;
use crate::shares::PoolTotals;
use crate::types::{AccountId, Lltv, MarketId, OraclePrice};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationParams {
    /// How fast the incentive grows as LLTV falls. Zero means no incentive.
    pub cursor: Decimal,
    /// Hard cap on the incentive factor.
    pub max_incentive: Decimal,
}

impl Default for LiquidationParams {
    fn default() -> Self {
        Self {
            cursor: dec!(0.3),
            max_incentive: dec!(1.15),
        }
    }
}

/// LIF = min(max_incentive, 1 / (1 - cursor * (1 - lltv)))
pub fn incentive_factor(lltv: Lltv, params: &LiquidationParams) -> Decimal {
    let denominator = Decimal::ONE - params.cursor * (Decimal::ONE - lltv.value());
    if denominator <= Decimal::ZERO {
        return params.max_incentive;
    }
    (Decimal::ONE / denominator).min(params.max_incentive)
}

/// What happens to a batch when one of its items fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// One failure rolls back every item of the batch.
    #[default]
    AbortOnFailure,
    /// Each item commits or fails on its own; failures are reported and skipped.
    SkipFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationItem {
    pub market_id: MarketId,
    pub borrower: AccountId,
    pub max_collateral: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiquidationPlan {
    pub seized_collateral: u128,
    pub repaid_assets: u128,
    pub repaid_shares: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LiquidationError {
    #[error("Nothing to seize")]
    NothingToSeize,

    #[error("Seizure too small to repay any debt")]
    NothingRepaid,

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Sizes a liquidation. The caller has already established that the position
/// is unhealthy, which implies it carries debt with a non-zero value.
pub fn plan_liquidation(
    pool: &PoolTotals,
    position: &Position,
    max_collateral: u128,
    incentive: Decimal,
    borrow_price: OraclePrice,
    collateral_price: OraclePrice,
) -> Result<LiquidationPlan, LiquidationError> {
    let mut seized = max_collateral.min(position.collateral);
    if seized == 0 {
        return Err(LiquidationError::NothingToSeize);
    }

    let debt_assets = pool.to_borrow_assets(position.borrow_shares, Rounding::Up)?;
    // loan asset price grossed up by the incentive, at ORACLE_PRICE_SCALE
    let repay_price = math::wide_mul_div(
        math::scale_decimal(borrow_price.value(), Rounding::Up)?,
        math::scale_decimal(incentive, Rounding::Up)?,
        U256::from(ORACLE_PRICE_SCALE),
        Rounding::Up,
    )?;
    if repay_price.is_zero() {
        return Err(LiquidationError::NothingRepaid);
    }

    let collateral_price = math::scale_decimal(collateral_price.value(), Rounding::Down)?;
    let seized_value = U256::from(seized)
        .checked_mul(collateral_price)
        .ok_or(MathError::Overflow)?;
    let repayable = seized_value / repay_price;

    let (mut repaid_assets, repaid_shares) = if repayable >= U256::from(debt_assets) {
        if !collateral_price.is_zero() {
            // collateral matching the full debt plus incentive, no more
            let matching = math::wide_mul_div(
                U256::from(debt_assets),
                repay_price,
                collateral_price,
                Rounding::Down,
            )?;
            // a dust position still gives up one unit so it can be closed
            let matching = u128::try_from(matching).unwrap_or(u128::MAX).max(1);
            seized = seized.min(matching);
        }
        (debt_assets, position.borrow_shares)
    } else {
        let repaid = math::narrow(repayable)?;
        (repaid, pool.to_borrow_shares(repaid, Rounding::Down)?)
    };

    if repaid_shares == 0 {
        repaid_assets = 0;
    }
    if seized == 0 {
        return Err(LiquidationError::NothingToSeize);
    }
    // a seizure that repays nothing is only allowed when it empties the
    // position, which hands the remaining debt to bad debt realization
    if repaid_assets == 0 && seized < position.collateral {
        return Err(LiquidationError::NothingRepaid);
    }

    Ok(LiquidationPlan {
        seized_collateral: seized,
        repaid_assets,
        repaid_shares,
    })
}
