//! Strategy execution: turns scored goods into persisted, ranked signals.

pub mod runner;

pub use runner::StrategyRunner;
