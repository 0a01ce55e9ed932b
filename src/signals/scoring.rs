//! Component scores and confidence calculation
//!
//! Each score is a sum of fixed bonuses capped at 1.0, so any finite
//! [`FeatureSet`] maps into [0, 1].

use crate::common::math;
use crate::indicators::FeatureSet;

pub const TREND_WEIGHT: f64 = 0.35;
pub const SPREAD_WEIGHT: f64 = 0.30;
pub const LIQUIDITY_WEIGHT: f64 = 0.35;

/// Price above its moving averages, positive fitted slope, recent gain and
/// bounded volatility.
pub fn trend_score(features: &FeatureSet) -> f64 {
    let price = features.current_price;
    let above = |ma: Option<f64>| ma.is_some_and(|ma| price > ma);

    let mut score: f64 = 0.0;

    if above(features.ma_24h) {
        score += 0.3;
    }
    if above(features.ma_72h) {
        score += 0.1;
    }
    if above(features.ma_168h) {
        score += 0.1;
    }

    if features.trend_slope > 0.0 {
        score += (features.trend_strength * 0.3).min(0.3);
    }

    if features.price_change_1d > 0.0 {
        score += (features.price_change_1d / 10.0 * 0.2).min(0.2);
    }

    if features.volatility > 0.0 && features.volatility < 10.0 {
        score += 0.1;
    }

    score.min(1.0)
}

/// Healthy spread ratio, spread narrower than usual, sane absolute spread.
pub fn spread_score(features: &FeatureSet) -> f64 {
    let mut score: f64 = 0.0;

    if features.spread_ratio > 0.01 && features.spread_ratio < 0.1 {
        score += 0.4;
    } else if features.spread_ratio >= 0.1 && features.spread_ratio < 0.15 {
        score += 0.2;
    }

    if features.spread_deviation < -0.2 {
        score += 0.4;
    } else if features.spread_deviation < 0.0 {
        score += 0.2;
    }

    if features.spread > 0.5 && features.spread < 10.0 {
        score += 0.2;
    }

    score.min(1.0)
}

/// Tiered listing/bid depth plus trading activity.
pub fn liquidity_score(features: &FeatureSet) -> f64 {
    let mut score: f64 = 0.0;

    if features.sell_count >= 50 {
        score += 0.4;
    } else if features.sell_count >= 20 {
        score += 0.2;
    }

    if features.buy_count >= 10 {
        score += 0.2;
    } else if features.buy_count >= 5 {
        score += 0.1;
    }

    if features.price_change_freq > 0.3 {
        score += 0.4;
    } else if features.price_change_freq > 0.1 {
        score += 0.2;
    }

    score.min(1.0)
}

/// Weighted blend of the three scores, 0..=100.
pub fn signal_strength(trend: f64, spread: f64, liquidity: f64) -> f64 {
    (trend * TREND_WEIGHT + spread * SPREAD_WEIGHT + liquidity * LIQUIDITY_WEIGHT) * 100.0
}

/// Mean score discounted by its spread: agreement between the three
/// components raises confidence.
pub fn calculate_confidence(scores: &[f64]) -> f64 {
    let avg = math::mean(scores).unwrap_or_default();
    let sd = math::std_dev(scores).unwrap_or_default();
    avg * (1.0 - sd)
}
