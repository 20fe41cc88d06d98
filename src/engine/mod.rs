// 8.0: core lending engine. routes supply, borrow, collateral and liquidation
// calls through the share ledger and the health check, and wraps each one in
// an atomic scope. deterministic, with all I/O behind collaborator traits.

mod borrow;
mod collateral;
mod core;
mod journal;
mod liquidations;
mod results;
mod supply;

pub use core::Engine;
pub use results::{BatchLiquidationResult, EngineError, LiquidationResult};
