//! Liquidation detection and execution.
//!
//! A liquidator takes collateral from an unhealthy position and repays the
//! matching debt. Sizing lives in [`crate::liquidation::plan_liquidation`];
//! this module checks eligibility, applies the plan to the ledgers, moves the
//! funds and writes off whatever debt is left once the collateral is gone.

use super::core::Engine;
use super::journal::Journal;
use super::results::{BatchLiquidationResult, EngineError, LiquidationResult};
use crate::auth::Authorizer;
use crate::custody::{Custody, Transfer};
use crate::events::{BadDebtEvent, EventPayload, LiquidationEvent};
use crate::health;
use crate::liquidation::{plan_liquidation, BatchPolicy, LiquidationItem};
use crate::oracle::PriceOracle;
use crate::shares::ShareDelta;
use crate::types::{AccountId, MarketId};
use tracing::{info, warn};

impl<O: PriceOracle, C: Custody, A: Authorizer> Engine<O, C, A> {
    /// Liquidates one position, seizing at most `max_collateral`.
    pub fn liquidate(
        &mut self,
        liquidator: AccountId,
        market_id: MarketId,
        borrower: AccountId,
        max_collateral: u128,
    ) -> Result<LiquidationResult, EngineError> {
        let item = LiquidationItem {
            market_id,
            borrower,
            max_collateral,
        };
        self.transact("liquidate", |engine, tx| engine.apply_liquidation(tx, liquidator, &item))
    }

    /// Liquidates several positions in order and sums their deltas.
    ///
    /// With [`BatchPolicy::AbortOnFailure`] the batch is one atomic operation:
    /// the first failing item undoes every item before it and the error names
    /// its index. With [`BatchPolicy::SkipFailed`] each item commits or fails
    /// on its own and failures are reported in the outcome list.
    pub fn liquidate_batch(
        &mut self,
        liquidator: AccountId,
        items: &[LiquidationItem],
        policy: BatchPolicy,
    ) -> Result<BatchLiquidationResult, EngineError> {
        match policy {
            BatchPolicy::AbortOnFailure => self.transact("liquidate_batch", |engine, tx| {
                let mut batch = BatchLiquidationResult::default();
                for (index, item) in items.iter().enumerate() {
                    let result = engine
                        .apply_liquidation(tx, liquidator, item)
                        .map_err(|source| EngineError::BatchItemFailed {
                            index,
                            source: Box::new(source),
                        })?;
                    batch.record(Ok(result));
                }
                Ok(batch)
            }),
            BatchPolicy::SkipFailed => {
                let mut batch = BatchLiquidationResult::default();
                for (index, item) in items.iter().enumerate() {
                    let outcome =
                        self.transact("liquidate", |engine, tx| engine.apply_liquidation(tx, liquidator, item));
                    if let Err(e) = &outcome {
                        warn!(index, market = ?item.market_id, borrower = %item.borrower, error = %e, "batch item skipped");
                    }
                    batch.record(outcome);
                }
                Ok(batch)
            }
        }
    }

    // Batch under the policy from config
    pub fn liquidate_batch_default(
        &mut self,
        liquidator: AccountId,
        items: &[LiquidationItem],
    ) -> Result<BatchLiquidationResult, EngineError> {
        let policy = self.config.batch_policy;
        self.liquidate_batch(liquidator, items, policy)
    }

    /// Borrowers in a market whose positions are currently liquidatable.
    pub fn unhealthy_positions(&self, market_id: MarketId) -> Result<Vec<AccountId>, EngineError> {
        let market = self.market_ref(market_id)?;

        let mut unhealthy = Vec::new();
        for (owner, position) in self.positions.in_market(market_id) {
            if !self.check_health(market, position)? {
                unhealthy.push(owner);
            }
        }
        unhealthy.sort();
        Ok(unhealthy)
    }

    fn apply_liquidation(
        &mut self,
        tx: &mut Journal,
        liquidator: AccountId,
        item: &LiquidationItem,
    ) -> Result<LiquidationResult, EngineError> {
        let LiquidationItem {
            market_id,
            borrower,
            max_collateral,
        } = *item;

        if max_collateral == 0 {
            return Err(EngineError::ZeroAmount);
        }
        if liquidator.is_null() || borrower.is_null() {
            return Err(EngineError::ZeroAddress);
        }

        let market = self.market_ref(market_id)?;
        let params = market.params;
        let incentive = market.incentive;
        let mut pool = market.pool;
        let mut position = self.positions.get(market_id, borrower);

        let borrow_price = self.oracle.price_of(params.loan_asset)?;
        let collateral_price = self.oracle.price_of(params.collateral_asset)?;

        let health = health::evaluate(&pool, &position, market.lltv, borrow_price, collateral_price)?;
        if health.healthy {
            return Err(EngineError::PositionHealthy { market_id, borrower });
        }

        let plan = plan_liquidation(
            &pool,
            &position,
            max_collateral,
            incentive,
            borrow_price,
            collateral_price,
        )?;

        position.remove_collateral(plan.seized_collateral)?;
        position.remove_borrow_shares(plan.repaid_shares)?;
        pool.burn_debt(ShareDelta {
            assets: plan.repaid_assets,
            shares: plan.repaid_shares,
        })?;

        let mut bad_debt = 0;
        let mut burned_shares = 0;
        if position.collateral == 0 && position.has_debt() {
            burned_shares = position.borrow_shares;
            bad_debt = pool.realize_bad_debt(burned_shares)?;
            position.remove_borrow_shares(burned_shares)?;
            info!(market = ?market_id, %borrower, written_off = bad_debt, "bad debt realized");
        }

        self.write_pool(tx, market_id, pool)?;
        self.write_position(tx, market_id, borrower, position);

        tx.stage_transfer(Transfer::Out {
            asset: params.collateral_asset,
            to: liquidator,
            amount: plan.seized_collateral,
        });
        tx.stage_transfer(Transfer::In {
            asset: params.loan_asset,
            from: liquidator,
            amount: plan.repaid_assets,
        });
        tx.stage_event(EventPayload::Liquidation(LiquidationEvent {
            market_id,
            liquidator,
            borrower,
            seized_collateral: plan.seized_collateral,
            repaid_assets: plan.repaid_assets,
            repaid_shares: plan.repaid_shares,
            resulting_borrow_shares: position.borrow_shares,
            resulting_collateral: position.collateral,
        }));
        if burned_shares > 0 {
            tx.stage_event(EventPayload::BadDebt(BadDebtEvent {
                market_id,
                borrower,
                written_off_assets: bad_debt,
                burned_shares,
            }));
        }

        Ok(LiquidationResult {
            market_id,
            borrower,
            seized_collateral: plan.seized_collateral,
            repaid_assets: plan.repaid_assets,
            repaid_shares: plan.repaid_shares,
            bad_debt,
            collateral_delta: negated(plan.seized_collateral)?,
            borrow_delta: negated(plan.repaid_assets)?,
        })
    }
}

fn negated(amount: u128) -> Result<i128, EngineError> {
    i128::try_from(amount)
        .map(|n| -n)
        .map_err(|_| EngineError::MathOverflow)
}
