//! Shared data models spanning the engine layers.

pub mod backtest;
pub mod learning;
pub mod signal;
pub mod snapshot;
pub mod strategy;

pub use backtest::{BacktestResult, BacktestSummary, BacktestTrade};
pub use learning::{BlacklistEntry, LearningLog, LearningStatus};
pub use signal::{TradeSignal, SIGNAL_TTL_HOURS};
pub use snapshot::PriceSnapshot;
pub use strategy::{StrategyConfig, StrategyStatus, StrategyVersion, DEFAULT_STRATEGY_VERSION};
