// 12.0 config.rs: all settings in one place. risk tiers, liquidation incentive,
// batch policy, event retention.
// 12.1 two shapes of market book: one global lltv, or a fixed ladder of buckets.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::liquidation::{BatchPolicy, LiquidationParams};
use crate::tiers::{RiskTierRegistry, TierError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingConfig {
    // LLTV per bucket, strictly ascending. a single entry is the single-tier variant.
    pub tiers: Vec<Decimal>,
    pub liquidation: LiquidationParams,
    // used by liquidate_batch_default
    pub batch_policy: BatchPolicy,
    // Maximum number of events to retain in memory
    pub max_events: usize,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self::bucketed()
    }
}

impl LendingConfig {
    // One global ratio for every market
    pub fn single_tier(lltv: Decimal) -> Self {
        Self {
            tiers: vec![lltv],
            liquidation: LiquidationParams::default(),
            batch_policy: BatchPolicy::AbortOnFailure,
            max_events: 100_000,
        }
    }

    // The standard discrete ladder, from conservative to aggressive
    pub fn bucketed() -> Self {
        Self {
            tiers: vec![
                dec!(0.385),
                dec!(0.625),
                dec!(0.77),
                dec!(0.86),
                dec!(0.915),
                dec!(0.945),
                dec!(0.965),
                dec!(0.98),
            ],
            ..Self::single_tier(dec!(0.86))
        }
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    pub fn with_liquidation(mut self, params: LiquidationParams) -> Self {
        self.liquidation = params;
        self
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry()?;

        if self.liquidation.cursor < Decimal::ZERO || self.liquidation.cursor >= Decimal::ONE {
            return Err(ConfigError::InvalidLiquidation {
                reason: "cursor must be in [0, 1)".to_string(),
            });
        }

        if self.liquidation.max_incentive < Decimal::ONE {
            return Err(ConfigError::InvalidLiquidation {
                reason: "max incentive below 1 would let liquidators repay more than they seize".to_string(),
            });
        }

        if self.max_events == 0 {
            return Err(ConfigError::InvalidEvents {
                reason: "event log must retain at least one event".to_string(),
            });
        }

        Ok(())
    }

    pub fn registry(&self) -> Result<RiskTierRegistry, ConfigError> {
        RiskTierRegistry::bucketed(&self.tiers).map_err(ConfigError::InvalidTiers)
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid risk tiers: {0}")]
    InvalidTiers(TierError),

    #[error("Invalid liquidation params: {reason}")]
    InvalidLiquidation { reason: String },

    #[error("Invalid event settings: {reason}")]
    InvalidEvents { reason: String },
}
