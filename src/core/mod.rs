//! Runtime primitives: cron tasks and the engine wiring around them.

pub mod runtime;
pub mod scheduler;

pub use runtime::{QuantRuntime, RuntimeConfig};
pub use scheduler::{CronTask, DailyLearningScheduler, SignalRefreshScheduler};
