// 4.0: markets. a market pairs one loan asset with one collateral asset under
// one risk bucket. params are the identity; everything else is derived from
// them at creation and frozen, except the pool totals.

use crate::shares::PoolTotals;
use crate::types::{AssetId, Lltv, MarketId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketParams {
    pub loan_asset: AssetId,
    pub collateral_asset: AssetId,
    // index into the risk tier registry
    pub bucket: usize,
}

impl MarketParams {
    pub fn new(loan_asset: AssetId, collateral_asset: AssetId, bucket: usize) -> Self {
        Self {
            loan_asset,
            collateral_asset,
            bucket,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub id: MarketId,
    pub params: MarketParams,
    pub lltv: Lltv,
    // liquidation incentive factor, fixed by lltv at creation
    pub incentive: Decimal,
    pub pool: PoolTotals,
    pub created_at: Timestamp,
}

impl MarketState {
    pub fn new(id: MarketId, params: MarketParams, lltv: Lltv, incentive: Decimal, created_at: Timestamp) -> Self {
        Self {
            id,
            params,
            lltv,
            incentive,
            pool: PoolTotals::new(),
            created_at,
        }
    }

    pub fn utilization(&self) -> Option<Decimal> {
        self.pool.utilization()
    }

    pub fn available_liquidity(&self) -> u128 {
        self.pool.available_liquidity()
    }
}
