use crate::models::StrategyVersion;
use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionDecision {
    /// Leave in `validating`.
    Keep,
    /// Make active, archiving the current active version.
    Promote,
    /// Archive without ever activating.
    Reject,
}

/// Decides what happens to versions sitting in `validating`.
pub trait PromotionPolicy: Send + Sync {
    fn decide(&self, version: &StrategyVersion, now: DateTime<Utc>) -> PromotionDecision;
}

/// Leaves every version for an operator to promote by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualPromotion;

impl PromotionPolicy for ManualPromotion {
    fn decide(&self, version: &StrategyVersion, now: DateTime<Utc>) -> PromotionDecision {
        let validating_hours = version
            .validation_start_time
            .map(|start| (now - start).num_hours())
            .unwrap_or_default();
        info!(
            version = %version.version,
            validating_hours = validating_hours,
            "ManualPromotion: {} awaiting manual promotion",
            version.version
        );
        PromotionDecision::Keep
    }
}
