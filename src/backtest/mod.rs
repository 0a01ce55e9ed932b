//! Walk-forward replay of the signal generator over stored history.

pub mod engine;
pub mod metrics;
pub mod state;

pub use engine::{BacktestDataset, BacktestEngine, GoodHistory};
pub use metrics::{max_drawdown, sharpe_ratio, summarize, INITIAL_CAPITAL};
pub use state::{replay, PositionState, Round, LOOKBACK};
