// 9.0 oracle.rs: how the engine reads prices. the engine does not care whether
// prices come from Pyth, Chainlink or a test fixture; it only sees this trait.
// a zero price is a real answer (worthless asset), a missing feed is an error.

use crate::types::{AssetId, OraclePrice};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("No price available for asset {0:?}")]
    PriceUnavailable(AssetId),
}

pub trait PriceOracle {
    fn price_of(&self, asset: AssetId) -> Result<OraclePrice, OracleError>;
}

// Prices set directly by the host. used by the simulator and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticOracle {
    prices: HashMap<AssetId, OraclePrice>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, asset: AssetId, price: OraclePrice) -> Self {
        self.set_price(asset, price);
        self
    }

    pub fn set_price(&mut self, asset: AssetId, price: OraclePrice) {
        self.prices.insert(asset, price);
    }

    pub fn remove_price(&mut self, asset: AssetId) -> Option<OraclePrice> {
        self.prices.remove(&asset)
    }
}

impl PriceOracle for StaticOracle {
    fn price_of(&self, asset: AssetId) -> Result<OraclePrice, OracleError> {
        self.prices
            .get(&asset)
            .copied()
            .ok_or(OracleError::PriceUnavailable(asset))
    }
}
