// 11.0: every committed state change produces an event. used for audit trails,
// state reconstruction, and notifying external systems. events of a failed
// operation are never published.

use crate::types::{AccountId, AssetId, Lltv, MarketId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    MarketCreated(MarketCreatedEvent),

    // Lender events
    Supply(SupplyEvent),
    Withdraw(WithdrawEvent),

    // Borrower events
    Borrow(BorrowEvent),
    Repay(RepayEvent),
    SupplyCollateral(CollateralEvent),
    WithdrawCollateral(CollateralEvent),

    // Risk events
    Liquidation(LiquidationEvent),
    BadDebt(BadDebtEvent),

    InterestAccrued(InterestAccruedEvent),
    AuthorizationSet(AuthorizationSetEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketCreatedEvent {
    pub market_id: MarketId,
    pub loan_asset: AssetId,
    pub collateral_asset: AssetId,
    pub bucket: usize,
    pub lltv: Lltv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyEvent {
    pub market_id: MarketId,
    pub caller: AccountId,
    pub on_behalf: AccountId,
    pub assets: u128,
    pub shares: u128,
    pub resulting_shares: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawEvent {
    pub market_id: MarketId,
    pub caller: AccountId,
    pub on_behalf: AccountId,
    pub receiver: AccountId,
    pub assets: u128,
    pub shares: u128,
    pub resulting_shares: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowEvent {
    pub market_id: MarketId,
    pub caller: AccountId,
    pub on_behalf: AccountId,
    pub receiver: AccountId,
    pub assets: u128,
    pub shares: u128,
    pub resulting_shares: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayEvent {
    pub market_id: MarketId,
    pub caller: AccountId,
    pub on_behalf: AccountId,
    pub assets: u128,
    pub shares: u128,
    pub resulting_shares: u128,
}

// shared by supply and withdraw of collateral. receiver equals caller on supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralEvent {
    pub market_id: MarketId,
    pub caller: AccountId,
    pub on_behalf: AccountId,
    pub receiver: AccountId,
    pub amount: u128,
    pub resulting_collateral: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub market_id: MarketId,
    pub liquidator: AccountId,
    pub borrower: AccountId,
    pub seized_collateral: u128,
    pub repaid_assets: u128,
    pub repaid_shares: u128,
    pub resulting_borrow_shares: u128,
    pub resulting_collateral: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadDebtEvent {
    pub market_id: MarketId,
    pub borrower: AccountId,
    pub written_off_assets: u128,
    pub burned_shares: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestAccruedEvent {
    pub market_id: MarketId,
    pub interest: u128,
    pub total_borrow_assets: u128,
    pub total_supply_assets: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSetEvent {
    pub owner: AccountId,
    pub actor: AccountId,
    pub authorized: bool,
}

impl EventPayload {
    pub fn market_id(&self) -> Option<MarketId> {
        match self {
            EventPayload::MarketCreated(e) => Some(e.market_id),
            EventPayload::Supply(e) => Some(e.market_id),
            EventPayload::Withdraw(e) => Some(e.market_id),
            EventPayload::Borrow(e) => Some(e.market_id),
            EventPayload::Repay(e) => Some(e.market_id),
            EventPayload::SupplyCollateral(e) | EventPayload::WithdrawCollateral(e) => Some(e.market_id),
            EventPayload::Liquidation(e) => Some(e.market_id),
            EventPayload::BadDebt(e) => Some(e.market_id),
            EventPayload::InterestAccrued(e) => Some(e.market_id),
            EventPayload::AuthorizationSet(_) => None,
        }
    }
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

// Bounded in-memory log. oldest events are dropped once max_events is reached.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl EventEmitter for EventLog {
    fn emit(&mut self, event: Event) {
        self.events.push(event);

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
