//! Collateral deposits and withdrawals.

use super::core::Engine;
use super::journal::Journal;
use super::results::EngineError;
use crate::auth::Authorizer;
use crate::custody::{Custody, Transfer};
use crate::events::{CollateralEvent, EventPayload};
use crate::oracle::PriceOracle;
use crate::types::{AccountId, MarketId};

impl<O: PriceOracle, C: Custody, A: Authorizer> Engine<O, C, A> {
    pub fn supply_collateral(
        &mut self,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        self.transact("supply_collateral", |engine, tx| {
            engine.apply_supply_collateral(tx, market_id, caller, on_behalf, amount)
        })
    }

    /// Pulls collateral out of `on_behalf`'s position. Gated on health when
    /// the position carries debt.
    pub fn withdraw_collateral(
        &mut self,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        receiver: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        self.transact("withdraw_collateral", |engine, tx| {
            engine.apply_withdraw_collateral(tx, market_id, caller, on_behalf, receiver, amount)
        })
    }

    fn apply_supply_collateral(
        &mut self,
        tx: &mut Journal,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        if caller.is_null() || on_behalf.is_null() {
            return Err(EngineError::ZeroAddress);
        }

        let collateral_asset = self.market_ref(market_id)?.params.collateral_asset;
        let mut position = self.positions.get(market_id, on_behalf);
        position.add_collateral(amount)?;

        self.write_position(tx, market_id, on_behalf, position);
        tx.stage_transfer(Transfer::In {
            asset: collateral_asset,
            from: caller,
            amount,
        });
        tx.stage_event(EventPayload::SupplyCollateral(CollateralEvent {
            market_id,
            caller,
            on_behalf,
            receiver: caller,
            amount,
            resulting_collateral: position.collateral,
        }));

        Ok(())
    }

    fn apply_withdraw_collateral(
        &mut self,
        tx: &mut Journal,
        market_id: MarketId,
        caller: AccountId,
        on_behalf: AccountId,
        receiver: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        if caller.is_null() || on_behalf.is_null() || receiver.is_null() {
            return Err(EngineError::ZeroAddress);
        }
        self.ensure_authorized(on_behalf, caller)?;

        let market = self.market_ref(market_id)?;
        let collateral_asset = market.params.collateral_asset;
        let mut position = self.positions.get(market_id, on_behalf);
        position.remove_collateral(amount)?;

        if !self.check_health(market, &position)? {
            return Err(EngineError::InsufficientCollateral {
                market_id,
                account: on_behalf,
            });
        }

        self.write_position(tx, market_id, on_behalf, position);
        tx.stage_transfer(Transfer::Out {
            asset: collateral_asset,
            to: receiver,
            amount,
        });
        tx.stage_event(EventPayload::WithdrawCollateral(CollateralEvent {
            market_id,
            caller,
            on_behalf,
            receiver,
            amount,
            resulting_collateral: position.collateral,
        }));

        Ok(())
    }
}
