//! Unit tests for feature extraction

use crate::fixtures::{anchor, flat_series, rising_series};
use chrono::Duration;
use csquant::indicators::*;
use csquant::models::PriceSnapshot;
use csquant::Rejection;

#[test]
fn test_extract_requires_a_day_of_samples() {
    let snapshots = rising_series(1, 23, 10.0, 0.005, anchor());
    assert_eq!(
        FeatureExtractor::extract(&snapshots),
        Err(Rejection::InsufficientData {
            required: MIN_FEATURE_POINTS,
            actual: 23
        })
    );
    assert!(FeatureExtractor::extract(&[]).is_err());
}

#[test]
fn test_extract_short_window_leaves_long_averages_empty() {
    let snapshots = rising_series(1, 24, 10.0, 0.005, anchor());
    let features = FeatureExtractor::extract(&snapshots).unwrap();

    assert!(features.ma_24h.is_some());
    assert!(features.ema_24h.is_some());
    assert_eq!(features.ma_72h, None);
    assert_eq!(features.ma_168h, None);
    // No sample a full day back yet.
    assert_eq!(features.price_change_1d, 0.0);
    assert_eq!(features.price_change_7d, 0.0);
}

#[test]
fn test_extract_rising_series() {
    let snapshots = rising_series(1, 200, 5.0, 0.005, anchor());
    let features = FeatureExtractor::extract(&snapshots).unwrap();
    let latest = snapshots.last().unwrap();

    assert_eq!(features.current_price, latest.sell_price);
    assert!(features.current_price > features.ma_24h.unwrap());
    assert!(features.ma_24h.unwrap() > features.ma_72h.unwrap());
    assert!(features.ma_72h.unwrap() > features.ma_168h.unwrap());
    assert!(features.trend_slope > 0.0);
    assert!(features.trend_strength > 0.9 && features.trend_strength <= 1.0);
    assert!(features.price_change_1d > 0.0);
    assert!(features.price_change_7d > features.price_change_1d);
    assert!(features.volatility > 20.0 && features.volatility < 35.0);

    assert!((features.spread_ratio - 0.05).abs() < 1e-9);
    assert_eq!(features.sell_count, 80);
    assert_eq!(features.buy_count, 20);
    // Every hourly step of a 5+ price moves by more than a cent.
    assert!(features.price_change_freq > 0.99);
}

#[test]
fn test_extract_flat_series() {
    let snapshots = flat_series(1, 48, 10.0, anchor());
    let features = FeatureExtractor::extract(&snapshots).unwrap();

    assert_eq!(features.volatility, 0.0);
    assert_eq!(features.trend_slope, 0.0);
    assert_eq!(features.trend_strength, 0.0);
    assert_eq!(features.spread, 0.0);
    assert_eq!(features.spread_deviation, 0.0);
    assert_eq!(features.price_change_freq, 0.0);
}

#[test]
fn test_spread_ignores_missing_buy_price() {
    let mut snapshots = rising_series(1, 30, 10.0, 0.0, anchor());
    let last = snapshots.len() - 1;
    snapshots[last].buy_price = 0.0;

    let stats = SpreadStats::compute(&snapshots);
    assert_eq!(stats.spread, 0.0);
    assert_eq!(stats.spread_ratio, 0.0);
    assert!(stats.avg_spread > 0.0);
    assert!(stats.spread_deviation < 0.0);
}

#[test]
fn test_price_change_frequency_counts_moves_over_epsilon() {
    let prices = [10.0, 10.005, 10.5, 10.5, 11.0];
    // Two moves above a cent over five samples.
    assert!((price_change_frequency(&prices) - 0.4).abs() < 1e-12);
    assert_eq!(price_change_frequency(&[]), 0.0);
}

#[test]
fn test_extract_takes_depth_from_latest_snapshot() {
    let end = anchor();
    let mut snapshots = rising_series(1, 30, 10.0, 0.001, end - Duration::hours(1));
    snapshots.push(PriceSnapshot::new(1, 10.4, 9.9, end).with_counts(3, 1));

    let features = FeatureExtractor::extract(&snapshots).unwrap();
    assert_eq!(features.sell_count, 3);
    assert_eq!(features.buy_count, 1);
}
