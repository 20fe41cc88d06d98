//! Borrower side: borrow and repay of the loan asset.

use super::core::Engine;
use super::journal::Journal;
use super::results::EngineError;
use crate::auth::Authorizer;
use crate::custody::{Custody, Transfer};
use crate::events::{BorrowEvent, EventPayload, InterestAccruedEvent, RepayEvent};
use crate::oracle::PriceOracle;
use crate::shares::{Amount, ShareDelta};
use crate::types::{AccountId, MarketId};

impl<O: PriceOracle, C: Custody, A: Authorizer> Engine<O, C, A> {
    /// Borrows `assets` against `on_behalf`'s collateral and pays them to
    /// `receiver`. Debt shares are rounded up. The position must be healthy
    /// afterwards.
    pub fn borrow(
        &mut self,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        receiver: AccountId,
        assets: u128,
    ) -> Result<ShareDelta, EngineError> {
        self.transact("borrow", |engine, tx| {
            engine.apply_borrow(tx, market_id, caller, on_behalf, receiver, assets)
        })
    }

    /// Repays debt of `on_behalf` with funds from `caller`. No authorization
    /// needed: paying someone else's debt only helps them.
    pub fn repay(
        &mut self,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        amount: Amount,
    ) -> Result<ShareDelta, EngineError> {
        self.transact("repay", |engine, tx| {
            engine.apply_repay(tx, market_id, caller, on_behalf, amount)
        })
    }

    /// Lands interest computed by an external rate model on both pool sides.
    pub fn accrue_interest(&mut self, market_id: MarketId, interest: u128) -> Result<(), EngineError> {
        self.transact("accrue_interest", |engine, tx| {
            if interest == 0 {
                return Err(EngineError::ZeroAmount);
            }

            let mut pool = engine.market_ref(market_id)?.pool;
            pool.accrue_interest(interest)?;
            engine.write_pool(tx, market_id, pool)?;

            tx.stage_event(EventPayload::InterestAccrued(InterestAccruedEvent {
                market_id,
                interest,
                total_borrow_assets: pool.total_borrow_assets,
                total_supply_assets: pool.total_supply_assets,
            }));
            Ok(())
        })
    }

    fn apply_borrow(
        &mut self,
        tx: &mut Journal,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        receiver: AccountId,
        assets: u128,
    ) -> Result<ShareDelta, EngineError> {
        if assets == 0 {
            return Err(EngineError::ZeroAmount);
        }
        if caller.is_null() || on_behalf.is_null() || receiver.is_null() {
            return Err(EngineError::ZeroAddress);
        }
        self.ensure_authorized(on_behalf, caller)?;

        let market = self.market_ref(market_id)?;
        let loan_asset = market.params.loan_asset;
        let mut pool = market.pool;
        let mut position = self.positions.get(market_id, on_behalf);

        let delta = pool.borrow(assets)?;
        position.add_borrow_shares(delta.shares)?;

        // health is judged against the tentative state
        let mut tentative = market.clone();
        tentative.pool = pool;
        if !self.check_health(&tentative, &position)? {
            return Err(EngineError::InsufficientCollateral {
                market_id,
                account: on_behalf,
            });
        }

        self.write_pool(tx, market_id, pool)?;
        self.write_position(tx, market_id, on_behalf, position);
        tx.stage_transfer(Transfer::Out {
            asset: loan_asset,
            to: receiver,
            amount: assets,
        });
        tx.stage_event(EventPayload::Borrow(BorrowEvent {
            market_id,
            caller,
            on_behalf,
            receiver,
            assets,
            shares: delta.shares,
            resulting_shares: position.borrow_shares,
        }));

        Ok(delta)
    }

    fn apply_repay(
        &mut self,
        tx: &mut Journal,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        amount: Amount,
    ) -> Result<ShareDelta, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::ZeroAmount);
        }
        if caller.is_null() || on_behalf.is_null() {
            return Err(EngineError::ZeroAddress);
        }

        let market = self.market_ref(market_id)?;
        let loan_asset = market.params.loan_asset;
        let mut pool = market.pool;
        let mut position = self.positions.get(market_id, on_behalf);

        let delta = pool.repay(amount)?;
        position.remove_borrow_shares(delta.shares)?;

        self.write_pool(tx, market_id, pool)?;
        self.write_position(tx, market_id, on_behalf, position);
        tx.stage_transfer(Transfer::In {
            asset: loan_asset,
            from: caller,
            amount: delta.assets,
        });
        tx.stage_event(EventPayload::Repay(RepayEvent {
            market_id,
            caller,
            on_behalf,
            assets: delta.assets,
            shares: delta.shares,
            resulting_shares: position.borrow_shares,
        }));

        Ok(delta)
    }
}
