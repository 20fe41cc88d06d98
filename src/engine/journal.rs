//! Atomic operation scope.
//!
//! Every public mutation runs inside [`Engine::transact`]. Writes to pool
//! totals and positions go through the journal, which remembers the value each
//! one had before its first write. Transfers and events are staged rather than
//! performed. On success the liquidity invariant is re-checked for every
//! touched market, custody settles the staged transfers in one call and the
//! staged events are published. On any failure the remembered values are put
//! back and nothing leaves the engine.

use super::core::Engine;
use super::results::EngineError;
use crate::custody::{Custody, Transfer};
use crate::events::EventPayload;
use crate::position::Position;
use crate::shares::PoolTotals;
use crate::types::{AccountId, MarketId};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub(super) struct Journal {
    pools: HashMap<MarketId, PoolTotals>,
    positions: HashMap<(MarketId, AccountId), Option<Position>>,
    transfers: Vec<Transfer>,
    events: Vec<EventPayload>,
}

impl Journal {
    pub(super) fn stage_transfer(&mut self, transfer: Transfer) {
        if transfer.amount() > 0 {
            self.transfers.push(transfer);
        }
    }

    pub(super) fn stage_event(&mut self, payload: EventPayload) {
        self.events.push(payload);
    }

    pub(super) fn touched_markets(&self) -> impl Iterator<Item = MarketId> + '_ {
        self.pools.keys().copied()
    }
}

impl<O, C: Custody, A> Engine<O, C, A> {
    pub(super) fn transact<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self, &mut Journal) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut tx = Journal::default();

        let result = f(self, &mut tx).and_then(|value| {
            self.commit(&mut tx)?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                debug!(operation, "committed");
                Ok(value)
            }
            Err(e) => {
                self.rollback(tx);
                warn!(operation, error = %e, "rolled back");
                Err(e)
            }
        }
    }

    fn commit(&mut self, tx: &mut Journal) -> Result<(), EngineError> {
        for market_id in tx.touched_markets() {
            self.market_ref(market_id)?.pool.check_liquidity()?;
        }

        if !tx.transfers.is_empty() {
            self.custody.settle(&tx.transfers)?;
        }

        for payload in tx.events.drain(..) {
            self.emit_event(payload);
        }
        Ok(())
    }

    fn rollback(&mut self, tx: Journal) {
        for (market_id, pool) in tx.pools {
            if let Some(market) = self.markets.get_mut(&market_id) {
                market.pool = pool;
            }
        }
        for ((market_id, owner), previous) in tx.positions {
            self.positions.restore(market_id, owner, previous);
        }
    }

    pub(super) fn write_pool(&mut self, tx: &mut Journal, market_id: MarketId, pool: PoolTotals) -> Result<(), EngineError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(EngineError::UnknownMarket(market_id))?;
        tx.pools.entry(market_id).or_insert(market.pool);
        market.pool = pool;
        Ok(())
    }

    pub(super) fn write_position(&mut self, tx: &mut Journal, market_id: MarketId, owner: AccountId, position: Position) {
        let key = (market_id, owner);
        if !tx.positions.contains_key(&key) {
            tx.positions.insert(key, self.positions.entry(market_id, owner));
        }
        self.positions.set(market_id, owner, position);
    }
}
