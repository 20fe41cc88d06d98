//! Per-user balances in a market.
//!
//! A position holds supply shares, borrow shares and raw collateral. It comes
//! into existence on the first mutation and is never removed; a position whose
//! fields are all zero is simply empty. Every decrease is checked so no field
//! can go below zero.

use crate::shares::LedgerError;
use crate::types::{AccountId, MarketId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub supply_shares: u128,
    pub borrow_shares: u128,
    pub collateral: u128,
}

impl Position {
    pub fn is_empty(&self) -> bool {
        self.supply_shares == 0 && self.borrow_shares == 0 && self.collateral == 0
    }

    pub fn has_debt(&self) -> bool {
        self.borrow_shares > 0
    }

    pub fn add_supply_shares(&mut self, shares: u128) -> Result<(), LedgerError> {
        self.supply_shares = increase(self.supply_shares, shares)?;
        Ok(())
    }

    pub fn remove_supply_shares(&mut self, shares: u128) -> Result<(), LedgerError> {
        self.supply_shares = decrease(self.supply_shares, shares)?;
        Ok(())
    }

    pub fn add_borrow_shares(&mut self, shares: u128) -> Result<(), LedgerError> {
        self.borrow_shares = increase(self.borrow_shares, shares)?;
        Ok(())
    }

    pub fn remove_borrow_shares(&mut self, shares: u128) -> Result<(), LedgerError> {
        self.borrow_shares = decrease(self.borrow_shares, shares)?;
        Ok(())
    }

    pub fn add_collateral(&mut self, amount: u128) -> Result<(), LedgerError> {
        self.collateral = increase(self.collateral, amount)?;
        Ok(())
    }

    pub fn remove_collateral(&mut self, amount: u128) -> Result<(), LedgerError> {
        self.collateral = decrease(self.collateral, amount)?;
        Ok(())
    }
}

fn increase(balance: u128, amount: u128) -> Result<u128, LedgerError> {
    balance
        .checked_add(amount)
        .ok_or(LedgerError::Math(crate::math::MathError::Overflow))
}

fn decrease(balance: u128, amount: u128) -> Result<u128, LedgerError> {
    balance
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientBalance {
            requested: amount,
            available: balance,
        })
}

/// All positions, keyed by market then owner. Reads of a missing position
/// return the empty position.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: HashMap<(MarketId, AccountId), Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, market_id: MarketId, owner: AccountId) -> Position {
        self.positions
            .get(&(market_id, owner))
            .copied()
            .unwrap_or_default()
    }

    /// Raw lookup that tells a never-touched position apart from an empty one.
    pub fn entry(&self, market_id: MarketId, owner: AccountId) -> Option<Position> {
        self.positions.get(&(market_id, owner)).copied()
    }

    pub fn set(&mut self, market_id: MarketId, owner: AccountId, position: Position) {
        self.positions.insert((market_id, owner), position);
    }

    /// Puts back a value captured earlier, including "did not exist".
    pub fn restore(&mut self, market_id: MarketId, owner: AccountId, previous: Option<Position>) {
        match previous {
            Some(position) => {
                self.positions.insert((market_id, owner), position);
            }
            None => {
                self.positions.remove(&(market_id, owner));
            }
        }
    }

    pub fn in_market(&self, market_id: MarketId) -> impl Iterator<Item = (AccountId, &Position)> + '_ {
        self.positions
            .iter()
            .filter(move |((market, _), _)| *market == market_id)
            .map(|((_, owner), position)| (*owner, position))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
