//! Sell/buy spread features

use crate::common::math;
use crate::models::PriceSnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadStats {
    /// Latest sell minus buy; 0 when the latest buy price is missing.
    pub spread: f64,
    /// Latest spread over latest buy price.
    pub spread_ratio: f64,
    /// Mean spread over the whole window.
    pub avg_spread: f64,
    /// (spread - avg) / avg; 0 when the average is not positive.
    pub spread_deviation: f64,
}

impl SpreadStats {
    pub fn compute(snapshots: &[PriceSnapshot]) -> Self {
        let Some(latest) = snapshots.last() else {
            return Self::default();
        };

        let spreads: Vec<f64> = snapshots.iter().map(PriceSnapshot::spread).collect();
        let avg_spread = math::mean(&spreads).unwrap_or_default();

        let (spread, spread_ratio) = if latest.buy_price > 0.0 {
            let spread = latest.spread();
            (spread, spread / latest.buy_price)
        } else {
            (0.0, 0.0)
        };

        let spread_deviation = if avg_spread > 0.0 {
            (spread - avg_spread) / avg_spread
        } else {
            0.0
        };

        Self {
            spread,
            spread_ratio,
            avg_spread,
            spread_deviation,
        }
    }
}
