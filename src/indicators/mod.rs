//! Technical and liquidity features computed from a snapshot window.

pub mod features;
pub mod liquidity;
pub mod spread;
pub mod trend;

pub use features::{FeatureExtractor, FeatureSet, MIN_FEATURE_POINTS};
pub use liquidity::{price_change_frequency, PRICE_CHANGE_EPSILON};
pub use spread::SpreadStats;
pub use trend::TrendStats;
