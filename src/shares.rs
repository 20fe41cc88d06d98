//! Share ledger for a market's supply and borrow pools.
//!
//! Lenders and borrowers hold shares, not assets. Interest accrues by growing
//! the asset totals while share totals stay put, so every holder's claim grows
//! in proportion without touching individual positions.
//!
//! Every conversion rounds against the user and in favor of the pool: shares
//! minted on supply round down, shares burned on withdraw round up, debt
//! shares minted on borrow round up and debt shares burned on repay round down.

use crate::math::{self, MathError, Rounding};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Input to withdraw and repay: either an exact asset amount or an exact
/// share amount. Shares let a user exit a position without leaving dust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amount {
    Assets(u128),
    Shares(u128),
}

impl Amount {
    pub fn is_zero(&self) -> bool {
        match self {
            Amount::Assets(n) | Amount::Shares(n) => *n == 0,
        }
    }
}

/// Assets and shares moved by one ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShareDelta {
    pub assets: u128,
    pub shares: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient liquidity: borrowed {borrowed} would exceed supplied {supplied}")]
    InsufficientLiquidity { borrowed: u128, supplied: u128 },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("Conversion rounds to zero")]
    ZeroConversion,

    #[error("No outstanding debt to accrue interest on")]
    NoOutstandingDebt,

    #[error(transparent)]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolTotals {
    pub total_supply_assets: u128,
    pub total_supply_shares: u128,
    pub total_borrow_assets: u128,
    pub total_borrow_shares: u128,
}

impl PoolTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_supply_shares(&self, assets: u128, rounding: Rounding) -> Result<u128, MathError> {
        math::to_shares(assets, self.total_supply_assets, self.total_supply_shares, rounding)
    }

    pub fn to_supply_assets(&self, shares: u128, rounding: Rounding) -> Result<u128, MathError> {
        math::to_assets(shares, self.total_supply_assets, self.total_supply_shares, rounding)
    }

    pub fn to_borrow_shares(&self, assets: u128, rounding: Rounding) -> Result<u128, MathError> {
        math::to_shares(assets, self.total_borrow_assets, self.total_borrow_shares, rounding)
    }

    pub fn to_borrow_assets(&self, shares: u128, rounding: Rounding) -> Result<u128, MathError> {
        math::to_assets(shares, self.total_borrow_assets, self.total_borrow_shares, rounding)
    }

    /// Liquidity still available to borrow or withdraw.
    pub fn available_liquidity(&self) -> u128 {
        self.total_supply_assets.saturating_sub(self.total_borrow_assets)
    }

    pub fn check_liquidity(&self) -> Result<(), LedgerError> {
        if self.total_borrow_assets > self.total_supply_assets {
            return Err(LedgerError::InsufficientLiquidity {
                borrowed: self.total_borrow_assets,
                supplied: self.total_supply_assets,
            });
        }
        Ok(())
    }

    /// Borrowed fraction of supplied assets, zero for an empty pool. `None`
    /// when the ratio cannot be represented as a `Decimal`.
    pub fn utilization(&self) -> Option<Decimal> {
        if self.total_supply_assets == 0 {
            return Some(Decimal::ZERO);
        }
        math::ratio(U256::from(self.total_borrow_assets), U256::from(self.total_supply_assets))
    }

    // 3.1: supply side

    pub fn supply(&mut self, assets: u128) -> Result<ShareDelta, LedgerError> {
        let shares = self.to_supply_shares(assets, Rounding::Down)?;
        if shares == 0 {
            return Err(LedgerError::ZeroConversion);
        }
        self.total_supply_assets = add(self.total_supply_assets, assets)?;
        self.total_supply_shares = add(self.total_supply_shares, shares)?;
        Ok(ShareDelta { assets, shares })
    }

    pub fn withdraw(&mut self, amount: Amount) -> Result<ShareDelta, LedgerError> {
        let delta = match amount {
            Amount::Assets(assets) => ShareDelta {
                assets,
                shares: self.to_supply_shares(assets, Rounding::Up)?,
            },
            Amount::Shares(shares) => ShareDelta {
                assets: self.to_supply_assets(shares, Rounding::Down)?,
                shares,
            },
        };
        if delta.assets == 0 {
            return Err(LedgerError::ZeroConversion);
        }
        self.total_supply_shares = sub(self.total_supply_shares, delta.shares)?;
        self.total_supply_assets = sub(self.total_supply_assets, delta.assets)?;
        self.check_liquidity()?;
        Ok(delta)
    }

    // 3.2: borrow side

    pub fn borrow(&mut self, assets: u128) -> Result<ShareDelta, LedgerError> {
        let shares = self.to_borrow_shares(assets, Rounding::Up)?;
        self.total_borrow_assets = add(self.total_borrow_assets, assets)?;
        self.total_borrow_shares = add(self.total_borrow_shares, shares)?;
        self.check_liquidity()?;
        Ok(ShareDelta { assets, shares })
    }

    pub fn repay(&mut self, amount: Amount) -> Result<ShareDelta, LedgerError> {
        let delta = match amount {
            Amount::Assets(assets) => ShareDelta {
                assets,
                shares: self.to_borrow_shares(assets, Rounding::Down)?,
            },
            Amount::Shares(shares) => ShareDelta {
                assets: self.to_borrow_assets(shares, Rounding::Up)?,
                shares,
            },
        };
        if delta.shares == 0 {
            return Err(LedgerError::ZeroConversion);
        }
        self.burn_debt(delta)?;
        Ok(delta)
    }

    /// Removes repaid debt from the borrow pool. The asset side floors at zero
    /// because share-to-asset rounding can overshoot the real total by a unit.
    pub fn burn_debt(&mut self, delta: ShareDelta) -> Result<(), LedgerError> {
        self.total_borrow_shares = sub(self.total_borrow_shares, delta.shares)?;
        self.total_borrow_assets = self.total_borrow_assets.saturating_sub(delta.assets);
        self.write_off_orphaned_debt();
        Ok(())
    }

    /// Writes off unrecoverable debt against lenders: the borrow and supply
    /// asset totals drop by the same amount, so the liquidity invariant holds.
    /// Returns the asset amount actually written off.
    pub fn realize_bad_debt(&mut self, shares: u128) -> Result<u128, LedgerError> {
        let owed = self.to_borrow_assets(shares, Rounding::Up)?;
        let written_off = owed.min(self.total_borrow_assets);
        self.total_borrow_shares = sub(self.total_borrow_shares, shares)?;
        self.total_borrow_assets -= written_off;
        self.total_supply_assets = self.total_supply_assets.saturating_sub(written_off);
        Ok(written_off + self.write_off_orphaned_debt())
    }

    // once the last debt share is gone, any asset remainder left by the
    // virtual offset belongs to nobody and comes off both sides
    fn write_off_orphaned_debt(&mut self) -> u128 {
        if self.total_borrow_shares != 0 {
            return 0;
        }
        let orphaned = self.total_borrow_assets;
        self.total_borrow_assets = 0;
        self.total_supply_assets = self.total_supply_assets.saturating_sub(orphaned);
        orphaned
    }

    // 3.3: interest computed by an external rate model lands on both sides.
    // with no debt shares outstanding nobody would owe it
    pub fn accrue_interest(&mut self, interest: u128) -> Result<(), LedgerError> {
        if self.total_borrow_shares == 0 {
            return Err(LedgerError::NoOutstandingDebt);
        }
        self.total_borrow_assets = add(self.total_borrow_assets, interest)?;
        self.total_supply_assets = add(self.total_supply_assets, interest)?;
        Ok(())
    }
}

fn add(a: u128, b: u128) -> Result<u128, LedgerError> {
    a.checked_add(b).ok_or(LedgerError::Math(MathError::Overflow))
}

fn sub(available: u128, requested: u128) -> Result<u128, LedgerError> {
    available
        .checked_sub(requested)
        .ok_or(LedgerError::InsufficientBalance { requested, available })
}
