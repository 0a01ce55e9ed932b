//! Signal sanity checks and position gating.

pub mod manager;

pub use manager::{PositionDecision, RiskManager, RiskReport};
