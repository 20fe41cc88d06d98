// 8.0.2: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::custody::CustodyError;
use crate::liquidation::LiquidationError;
use crate::math::MathError;
use crate::oracle::OracleError;
use crate::shares::LedgerError;
use crate::tiers::TierError;
use crate::types::{AccountId, MarketId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationResult {
    pub market_id: MarketId,
    pub borrower: AccountId,
    pub seized_collateral: u128,
    pub repaid_assets: u128,
    pub repaid_shares: u128,
    // debt written off against lenders once the collateral ran out
    pub bad_debt: u128,
    // signed changes to the borrower's position: (-seized, -repaid)
    pub collateral_delta: i128,
    pub borrow_delta: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchLiquidationResult {
    // one entry per item, in input order
    pub outcomes: Vec<Result<LiquidationResult, EngineError>>,
    pub total_collateral_delta: i128,
    pub total_borrow_delta: i128,
}

impl BatchLiquidationResult {
    pub fn succeeded(&self) -> impl Iterator<Item = &LiquidationResult> {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (usize, &EngineError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.as_ref().err().map(|e| (index, e)))
    }

    pub(super) fn record(&mut self, outcome: Result<LiquidationResult, EngineError>) {
        if let Ok(result) = &outcome {
            self.total_collateral_delta = self.total_collateral_delta.saturating_add(result.collateral_delta);
            self.total_borrow_delta = self.total_borrow_delta.saturating_add(result.borrow_delta);
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Market {0:?} not found")]
    UnknownMarket(MarketId),

    #[error("Unknown tier {bucket}: registry has {tiers} tiers")]
    UnknownTier { bucket: usize, tiers: usize },

    #[error("Amount must be non-zero")]
    ZeroAmount,

    #[error("Null account cannot own positions or receive funds")]
    ZeroAddress,

    #[error("Account {actor} may not act on behalf of {owner}")]
    Unauthorized { owner: AccountId, actor: AccountId },

    #[error("Position of {account} in market {market_id:?} would be unhealthy")]
    InsufficientCollateral { market_id: MarketId, account: AccountId },

    #[error("Insufficient liquidity: borrowed {borrowed} would exceed supplied {supplied}")]
    InsufficientLiquidity { borrowed: u128, supplied: u128 },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("No outstanding debt to accrue interest on")]
    NoOutstandingDebt,

    #[error("Position of {borrower} in market {market_id:?} is healthy")]
    PositionHealthy { market_id: MarketId, borrower: AccountId },

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch item {index} failed: {source}")]
    BatchItemFailed { index: usize, source: Box<EngineError> },
}

impl From<MathError> for EngineError {
    fn from(_: MathError) -> Self {
        EngineError::MathOverflow
    }
}

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientLiquidity { borrowed, supplied } => {
                EngineError::InsufficientLiquidity { borrowed, supplied }
            }
            LedgerError::InsufficientBalance { requested, available } => {
                EngineError::InsufficientBalance { requested, available }
            }
            LedgerError::ZeroConversion => EngineError::ZeroAmount,
            LedgerError::NoOutstandingDebt => EngineError::NoOutstandingDebt,
            LedgerError::Math(_) => EngineError::MathOverflow,
        }
    }
}

impl From<TierError> for EngineError {
    fn from(e: TierError) -> Self {
        match e {
            TierError::UnknownTier { bucket, tiers } => EngineError::UnknownTier { bucket, tiers },
            other => EngineError::Config(ConfigError::InvalidTiers(other)),
        }
    }
}

impl From<LiquidationError> for EngineError {
    fn from(e: LiquidationError) -> Self {
        match e {
            LiquidationError::NothingToSeize | LiquidationError::NothingRepaid => EngineError::ZeroAmount,
            LiquidationError::Math(_) => EngineError::MathOverflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_stable_kinds() {
        assert_eq!(EngineError::from(LedgerError::ZeroConversion), EngineError::ZeroAmount);
        assert_eq!(
            EngineError::from(LedgerError::Math(MathError::Overflow)),
            EngineError::MathOverflow
        );
        assert_eq!(
            EngineError::from(LedgerError::InsufficientBalance { requested: 2, available: 1 }),
            EngineError::InsufficientBalance { requested: 2, available: 1 }
        );
    }

    #[test]
    fn unknown_tier_keeps_its_kind() {
        let e = EngineError::from(TierError::UnknownTier { bucket: 9, tiers: 8 });
        assert_eq!(e, EngineError::UnknownTier { bucket: 9, tiers: 8 });

        let e = EngineError::from(TierError::Empty);
        assert!(matches!(e, EngineError::Config(_)));
    }

    #[test]
    fn batch_totals_skip_failures() {
        let ok = LiquidationResult {
            market_id: MarketId(1),
            borrower: AccountId(2),
            seized_collateral: 10,
            repaid_assets: 5,
            repaid_shares: 5_000_000,
            bad_debt: 0,
            collateral_delta: -10,
            borrow_delta: -5,
        };

        let mut batch = BatchLiquidationResult::default();
        batch.record(Ok(ok));
        batch.record(Err(EngineError::ZeroAmount));
        batch.record(Ok(ok));

        assert_eq!(batch.total_collateral_delta, -20);
        assert_eq!(batch.total_borrow_delta, -10);
        assert_eq!(batch.succeeded().count(), 2);
        assert_eq!(batch.failed().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
    }
}
