//! Lender side: supply and withdraw of the loan asset.

use super::core::Engine;
use super::journal::Journal;
use super::results::EngineError;
use crate::auth::Authorizer;
use crate::custody::{Custody, Transfer};
use crate::events::{EventPayload, SupplyEvent, WithdrawEvent};
use crate::oracle::PriceOracle;
use crate::shares::{Amount, ShareDelta};
use crate::types::{AccountId, MarketId};

impl<O: PriceOracle, C: Custody, A: Authorizer> Engine<O, C, A> {
    /// Supplies `assets` of the loan asset from `caller`, crediting supply
    /// shares (rounded down) to `on_behalf`. Anyone may supply for anyone.
    pub fn supply(
        &mut self,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        assets: u128,
    ) -> Result<ShareDelta, EngineError> {
        self.transact("supply", |engine, tx| {
            engine.apply_supply(tx, market_id, caller, on_behalf, assets)
        })
    }

    /// Burns supply shares of `on_behalf` and pays the assets to `receiver`.
    /// `caller` must be `on_behalf` or authorized by it.
    pub fn withdraw(
        &mut self,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        receiver: AccountId,
        amount: Amount,
    ) -> Result<ShareDelta, EngineError> {
        self.transact("withdraw", |engine, tx| {
            engine.apply_withdraw(tx, market_id, caller, on_behalf, receiver, amount)
        })
    }

    fn apply_supply(
        &mut self,
        tx: &mut Journal,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        assets: u128,
    ) -> Result<ShareDelta, EngineError> {
        if assets == 0 {
            return Err(EngineError::ZeroAmount);
        }
        if caller.is_null() || on_behalf.is_null() {
            return Err(EngineError::ZeroAddress);
        }

        let market = self.market_ref(market_id)?;
        let loan_asset = market.params.loan_asset;
        let mut pool = market.pool;
        let mut position = self.positions.get(market_id, on_behalf);

        let delta = pool.supply(assets)?;
        position.add_supply_shares(delta.shares)?;

        self.write_pool(tx, market_id, pool)?;
        self.write_position(tx, market_id, on_behalf, position);
        tx.stage_transfer(Transfer::In {
            asset: loan_asset,
            from: caller,
            amount: assets,
        });
        tx.stage_event(EventPayload::Supply(SupplyEvent {
            market_id,
            caller,
            on_behalf,
            assets,
            shares: delta.shares,
            resulting_shares: position.supply_shares,
        }));

        Ok(delta)
    }

    fn apply_withdraw(
        &mut self,
        tx: &mut Journal,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        receiver: AccountId,
        amount: Amount,
    ) -> Result<ShareDelta, EngineError> {
        if amount.is_zero() {
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

        let delta = pool.withdraw(amount)?;
        position.remove_supply_shares(delta.shares)?;

        self.write_pool(tx, market_id, pool)?;
        self.write_position(tx, market_id, on_behalf, position);
        tx.stage_transfer(Transfer::Out {
            asset: loan_asset,
            to: receiver,
            amount: delta.assets,
        });
        tx.stage_event(EventPayload::Withdraw(WithdrawEvent {
            market_id,
            caller,
            on_behalf,
            receiver,
            assets: delta.assets,
            shares: delta.shares,
            resulting_shares: position.supply_shares,
        }));

        Ok(delta)
    }
}
