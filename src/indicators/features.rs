//! Feature extraction for one good's snapshot window.

use crate::common::math;
use crate::error::Rejection;
use crate::indicators::liquidity::price_change_frequency;
use crate::indicators::spread::SpreadStats;
use crate::indicators::trend::TrendStats;
use crate::models::PriceSnapshot;

pub const MIN_FEATURE_POINTS: usize = 24;

/// Ephemeral features recomputed per call; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub current_price: f64,
    pub ma_24h: Option<f64>,
    pub ma_72h: Option<f64>,
    pub ma_168h: Option<f64>,
    pub ema_24h: Option<f64>,
    /// Coefficient of variation of sell prices, percent.
    pub volatility: f64,
    pub price_change_1d: f64,
    pub price_change_7d: f64,

    pub trend_slope: f64,
    pub trend_strength: f64,

    pub spread: f64,
    pub spread_ratio: f64,
    pub avg_spread: f64,
    pub spread_deviation: f64,

    pub sell_count: u32,
    pub buy_count: u32,
    pub price_change_freq: f64,
}

pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Compute features from ascending snapshots.
    ///
    /// Fewer than [`MIN_FEATURE_POINTS`] samples yields
    /// [`Rejection::InsufficientData`], never a partial set.
    pub fn extract(snapshots: &[PriceSnapshot]) -> Result<FeatureSet, Rejection> {
        if snapshots.len() < MIN_FEATURE_POINTS {
            return Err(Rejection::InsufficientData {
                required: MIN_FEATURE_POINTS,
                actual: snapshots.len(),
            });
        }
        let Some(latest) = snapshots.last() else {
            return Err(Rejection::InsufficientData {
                required: MIN_FEATURE_POINTS,
                actual: 0,
            });
        };

        let prices: Vec<f64> = snapshots.iter().map(|s| s.sell_price).collect();
        let trend = TrendStats::compute(&prices);
        let spread = SpreadStats::compute(snapshots);

        Ok(FeatureSet {
            current_price: latest.sell_price,
            ma_24h: trend.ma_24h,
            ma_72h: trend.ma_72h,
            ma_168h: trend.ma_168h,
            ema_24h: trend.ema_24h,
            volatility: math::coefficient_of_variation(&prices),
            price_change_1d: trend.price_change_1d,
            price_change_7d: trend.price_change_7d,
            trend_slope: trend.slope,
            trend_strength: trend.strength,
            spread: spread.spread,
            spread_ratio: spread.spread_ratio,
            avg_spread: spread.avg_spread,
            spread_deviation: spread.spread_deviation,
            sell_count: latest.sell_count,
            buy_count: latest.buy_count,
            price_change_freq: price_change_frequency(&prices),
        })
    }
}
