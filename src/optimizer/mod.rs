//! Hyperparameter search with the backtest as objective.

pub mod grid;
pub mod objective;
pub mod search;

pub use grid::{tuned_params, Param, ParamAxis, ParamGrid, QUICK_OFFSETS, THRESHOLD_BOUNDS};
pub use objective::{DefaultObjective, Objective};
pub use search::{CancelFlag, Optimization, Optimizer};
