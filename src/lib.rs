// lending-core: accounting core of an over-collateralized lending market.
// solvency first: share math rounds for the pool, every borrow and collateral
// withdrawal is health-gated, every operation is all-or-nothing.
// all computation is deterministic; funds, prices and permissions sit behind traits.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, AccountId, AssetId, OraclePrice, Lltv
//   2.x  math.rs: exact mul-div, virtual offsets, share conversions
//   3.x  shares.rs: pool totals, supply/borrow share ledger
//   4.x  market.rs: market params + runtime state
//   5.x  tiers.rs: risk tier registry, bucket -> lltv
//   6.x  position.rs: per-user balances, position store
//   7.x  health.rs: health evaluation and position metrics
//   7.1  liquidation.rs: incentive factor, liquidation sizing, batch policy
//   8.x  engine/: core engine: supply, borrow, collateral, liquidations, journal
//   9.x  oracle.rs: price oracle trait + static prices
//   9.1  auth.rs: owner -> actor authorization relation
//   9.2  custody.rs: transfer settlement (in-memory)
//   11.x events.rs: state transition events for audit
//   12.x config.rs: tiers, liquidation params, batch policy, presets

// accounting modules
pub mod market;
pub mod math;
pub mod position;
pub mod shares;
pub mod tiers;
pub mod types;

// risk modules
pub mod health;
pub mod liquidation;

pub mod engine;
pub mod events;

// integration modules
pub mod auth;
pub mod config;
pub mod custody;
pub mod oracle;

// re exports for convenience
pub use auth::*;
pub use config::*;
pub use custody::*;
pub use engine::*;
pub use events::*;
pub use health::PositionHealth;
pub use liquidation::*;
pub use market::*;
pub use alloy_primitives::U256;
pub use math::{MathError, Rounding, ORACLE_PRICE_SCALE, VIRTUAL_ASSETS, VIRTUAL_SHARES};
pub use oracle::*;
pub use position::*;
pub use shares::*;
pub use tiers::*;
pub use types::*;
