// 8.0 engine/core.rs: main engine. holds all markets, positions and the
// collaborators that move funds, read prices and answer permission checks.

use super::results::EngineError;
use crate::auth::{AuthorizationRegistry, Authorizer};
use crate::config::LendingConfig;
use crate::custody::{Custody, InMemoryCustody};
use crate::events::{AuthorizationSetEvent, Event, EventEmitter, EventLog, EventPayload, MarketCreatedEvent};
use crate::health::{self, PositionHealth};
use crate::liquidation::incentive_factor;
use crate::market::{MarketParams, MarketState};
use crate::math::Rounding;
use crate::oracle::{PriceOracle, StaticOracle};
use crate::position::{Position, PositionStore};
use crate::tiers::RiskTierRegistry;
use crate::types::{AccountId, MarketId, Timestamp};
use std::collections::HashMap;
use tracing::{debug, info};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine<O = StaticOracle, C = InMemoryCustody, A = AuthorizationRegistry> {
    pub(super) config: LendingConfig,
    pub(super) registry: RiskTierRegistry,
    pub(super) markets: HashMap<MarketId, MarketState>,
    pub(super) market_index: HashMap<MarketParams, MarketId>,
    pub(super) positions: PositionStore,
    pub(super) oracle: O,
    pub(super) custody: C,
    pub(super) auth: A,
    pub(super) events: EventLog,
    pub(super) current_time: Timestamp,
}

impl Engine {
    // in-memory collaborators, for the simulator and tests
    pub fn new(config: LendingConfig) -> Result<Self, EngineError> {
        Self::with_collaborators(
            config,
            StaticOracle::new(),
            InMemoryCustody::new(),
            AuthorizationRegistry::new(),
        )
    }
}

impl<O, C> Engine<O, C, AuthorizationRegistry> {
    /// Grants or revokes `actor`'s right to act on `owner`'s positions.
    /// Returns whether the relation changed; an unchanged grant emits nothing.
    pub fn set_authorization(
        &mut self,
        owner: AccountId,
        actor: AccountId,
        authorized: bool,
    ) -> Result<bool, EngineError> {
        if owner.is_null() || actor.is_null() {
            return Err(EngineError::ZeroAddress);
        }

        let changed = self.auth.set(owner, actor, authorized);
        if changed {
            debug!(%owner, %actor, authorized, "authorization updated");
            self.emit_event(EventPayload::AuthorizationSet(AuthorizationSetEvent {
                owner,
                actor,
                authorized,
            }));
        }
        Ok(changed)
    }
}

impl<O, C, A> Engine<O, C, A> {
    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn registry(&self) -> &RiskTierRegistry {
        &self.registry
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn market(&self, market_id: MarketId) -> Option<&MarketState> {
        self.markets.get(&market_id)
    }

    pub fn market_id_of(&self, params: &MarketParams) -> Option<MarketId> {
        self.market_index.get(params).copied()
    }

    pub fn markets_iter(&self) -> impl Iterator<Item = (&MarketId, &MarketState)> {
        self.markets.iter()
    }

    pub fn position(&self, market_id: MarketId, owner: AccountId) -> Position {
        self.positions.get(market_id, owner)
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    // Assets the owner could withdraw right now, liquidity permitting
    pub fn supply_assets_of(&self, market_id: MarketId, owner: AccountId) -> Result<u128, EngineError> {
        let market = self.market_ref(market_id)?;
        let shares = self.positions.get(market_id, owner).supply_shares;
        Ok(market.pool.to_supply_assets(shares, Rounding::Down)?)
    }

    // Assets the owner would need to repay to clear the debt
    pub fn borrow_assets_of(&self, market_id: MarketId, owner: AccountId) -> Result<u128, EngineError> {
        let market = self.market_ref(market_id)?;
        let shares = self.positions.get(market_id, owner).borrow_shares;
        Ok(market.pool.to_borrow_assets(shares, Rounding::Up)?)
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn authorizer(&self) -> &A {
        &self.auth
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.events.recent(count)
    }

    pub(super) fn market_ref(&self, market_id: MarketId) -> Result<&MarketState, EngineError> {
        self.markets
            .get(&market_id)
            .ok_or(EngineError::UnknownMarket(market_id))
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let id = self.events.next_id();
        let event = Event::new(id, self.current_time, payload);
        debug!(event_id = event.id.0, payload = ?event.payload, "event");
        self.events.emit(event);
    }
}

impl<O: PriceOracle, C: Custody, A: Authorizer> Engine<O, C, A> {
    pub fn with_collaborators(config: LendingConfig, oracle: O, custody: C, auth: A) -> Result<Self, EngineError> {
        config.validate()?;
        let registry = config.registry()?;
        let events = EventLog::new(config.max_events);

        Ok(Self {
            config,
            registry,
            markets: HashMap::new(),
            market_index: HashMap::new(),
            positions: PositionStore::new(),
            oracle,
            custody,
            auth,
            events,
            current_time: Timestamp::from_millis(0),
        })
    }

    /// Creates a market, or returns the id of the identical market that
    /// already exists. Fails before any mutation when the bucket is unknown.
    pub fn create_market(&mut self, params: MarketParams) -> Result<MarketId, EngineError> {
        if let Some(&existing) = self.market_index.get(&params) {
            debug!(market = ?existing, "market already exists");
            return Ok(existing);
        }

        let lltv = self.registry.lltv_of(params.bucket)?;
        let incentive = incentive_factor(lltv, &self.config.liquidation);

        let next = u32::try_from(self.markets.len())
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or(EngineError::MathOverflow)?;
        let market_id = MarketId(next);

        self.markets.insert(
            market_id,
            MarketState::new(market_id, params, lltv, incentive, self.current_time),
        );
        self.market_index.insert(params, market_id);

        info!(market = ?market_id, bucket = params.bucket, %lltv, %incentive, "market created");
        self.emit_event(EventPayload::MarketCreated(MarketCreatedEvent {
            market_id,
            loan_asset: params.loan_asset,
            collateral_asset: params.collateral_asset,
            bucket: params.bucket,
            lltv,
        }));

        Ok(market_id)
    }

    /// Health of a position at live oracle prices. Always reads both prices.
    pub fn position_health(&self, market_id: MarketId, owner: AccountId) -> Result<PositionHealth, EngineError> {
        let market = self.market_ref(market_id)?;
        let position = self.positions.get(market_id, owner);
        self.evaluate(market, &position)
    }

    pub fn is_healthy(&self, market_id: MarketId, owner: AccountId) -> Result<bool, EngineError> {
        let market = self.market_ref(market_id)?;
        let position = self.positions.get(market_id, owner);
        self.check_health(market, &position)
    }

    pub(super) fn evaluate(&self, market: &MarketState, position: &Position) -> Result<PositionHealth, EngineError> {
        let borrow_price = self.oracle.price_of(market.params.loan_asset)?;
        let collateral_price = self.oracle.price_of(market.params.collateral_asset)?;
        Ok(health::evaluate(
            &market.pool,
            position,
            market.lltv,
            borrow_price,
            collateral_price,
        )?)
    }

    // a position without debt is healthy without asking the oracle
    pub(super) fn check_health(&self, market: &MarketState, position: &Position) -> Result<bool, EngineError> {
        if !position.has_debt() {
            return Ok(true);
        }
        Ok(self.evaluate(market, position)?.healthy)
    }

    pub(super) fn ensure_authorized(&self, owner: AccountId, actor: AccountId) -> Result<(), EngineError> {
        if owner == actor || self.auth.is_authorized(owner, actor) {
            Ok(())
        } else {
            Err(EngineError::Unauthorized { owner, actor })
        }
    }
}
