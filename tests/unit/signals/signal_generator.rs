//! Unit tests for the signal generator

use crate::fixtures::{anchor, flat_series, rising_series, wide_volatility_config};
use csquant::models::{PriceSnapshot, StrategyConfig};
use csquant::signals::signal_generator::FORECAST_STEPS;
use csquant::signals::{SignalGenerator, MIN_SIGNAL_POINTS};
use csquant::Rejection;

/// The rising fixture with its final bid lifted so the spread narrows
/// sharply: every component scores near 1.
fn narrowing_spread_series() -> Vec<PriceSnapshot> {
    let mut snapshots = rising_series(1, 200, 20.0, 0.005, anchor());
    let last = snapshots.len() - 1;
    snapshots[last].buy_price = snapshots[last].sell_price / 1.02;
    snapshots
}

#[test]
fn test_generate_requires_a_week_of_samples() {
    let generator = SignalGenerator::new(wide_volatility_config());
    let snapshots = rising_series(1, 167, 5.0, 0.005, anchor());

    assert_eq!(
        generator.generate(1, &snapshots),
        Err(Rejection::InsufficientData {
            required: MIN_SIGNAL_POINTS,
            actual: 167
        })
    );
}

#[test]
fn test_generate_accepts_steady_climb() {
    let generator = SignalGenerator::new(wide_volatility_config());
    let snapshots = rising_series(1, 200, 5.0, 0.005, anchor());
    let signal = generator.generate(1, &snapshots).unwrap();
    let latest = snapshots.last().unwrap();

    assert_eq!(signal.good_id, 1);
    assert_eq!(signal.current_sell_price, latest.sell_price);
    assert_eq!(signal.current_buy_price, latest.buy_price);
    assert_eq!(signal.signal_time, latest.timestamp);

    assert!((signal.trend_score - 0.995).abs() < 0.001);
    assert!((signal.spread_score - 0.6).abs() < 1e-9);
    assert_eq!(signal.liquidity_score, 1.0);
    assert!((signal.volatility - 28.56).abs() < 0.01);

    let ratio = signal.predicted_price_7d / signal.current_sell_price;
    assert!((ratio - 1.294).abs() < 0.001);
    assert!((signal.predicted_profit_rate - 34.86).abs() < 0.01);
    assert!((signal.confidence_score - 0.703).abs() < 0.001);
    assert!((signal.signal_strength - 87.8).abs() < 0.05);

    // Below the high-confidence bar: one unit.
    assert_eq!(signal.recommended_quantity, 1);
    assert!((signal.max_investment - signal.current_buy_price).abs() < 1e-12);
    assert!(signal.reason.contains("expected profit"));
}

#[test]
fn test_generate_forecast_follows_slope() {
    let generator = SignalGenerator::new(wide_volatility_config());
    let snapshots = rising_series(1, 200, 5.0, 0.005, anchor());
    let signal = generator.generate(1, &snapshots).unwrap();

    let prices: Vec<f64> = snapshots.iter().map(|s| s.sell_price).collect();
    let (slope, _) = csquant::common::math::linear_trend(&prices);
    let expected = signal.current_sell_price * (1.0 + slope * FORECAST_STEPS);
    assert!((signal.predicted_price_7d - expected).abs() < 1e-9);
}

#[test]
fn test_generate_rejects_volatility_over_cap() {
    let generator = SignalGenerator::new(StrategyConfig::default());
    let snapshots = rising_series(1, 200, 5.0, 0.005, anchor());

    match generator.generate(1, &snapshots) {
        Err(Rejection::ThresholdNotMet { metric, value, threshold }) => {
            assert_eq!(metric, "volatility");
            assert!(value > threshold);
        }
        other => panic!("expected volatility rejection, got {:?}", other),
    }
}

#[test]
fn test_generate_rejects_thin_market() {
    let generator = SignalGenerator::new(wide_volatility_config());
    let snapshots: Vec<PriceSnapshot> = rising_series(1, 200, 5.0, 0.005, anchor())
        .into_iter()
        .map(|s| s.with_counts(0, 0))
        .collect();

    match generator.generate(1, &snapshots) {
        Err(Rejection::ThresholdNotMet { metric, value, .. }) => {
            assert_eq!(metric, "liquidity score");
            assert!((value - 0.4).abs() < 1e-9);
        }
        other => panic!("expected liquidity rejection, got {:?}", other),
    }
}

#[test]
fn test_generate_rejects_flat_market_on_trend() {
    let generator = SignalGenerator::new(wide_volatility_config());
    let snapshots = flat_series(1, 200, 10.0, anchor());

    match generator.generate(1, &snapshots) {
        Err(Rejection::ThresholdNotMet { metric, value, .. }) => {
            assert_eq!(metric, "trend score");
            assert_eq!(value, 0.0);
        }
        other => panic!("expected trend rejection, got {:?}", other),
    }
}

#[test]
fn test_generate_rejects_profit_below_minimum() {
    let config = StrategyConfig {
        min_profit_rate: 50.0,
        ..wide_volatility_config()
    };
    let generator = SignalGenerator::new(config);
    let snapshots = rising_series(1, 200, 5.0, 0.005, anchor());

    match generator.generate(1, &snapshots) {
        Err(Rejection::ThresholdNotMet { metric, .. }) => assert_eq!(metric, "predicted profit rate"),
        other => panic!("expected profit rejection, got {:?}", other),
    }
}

#[test]
fn test_generate_rejects_missing_bid() {
    let generator = SignalGenerator::new(wide_volatility_config());
    let mut snapshots = narrowing_spread_series();
    let last = snapshots.len() - 1;
    snapshots[last].buy_price = 0.0;

    // Spread collapses to 0 without a bid, so scoring may reject first; a
    // zero bid must never produce a signal.
    assert!(generator.generate(1, &snapshots).is_err());
}

#[test]
fn test_generate_top_confidence_buys_multiple() {
    let generator = SignalGenerator::new(wide_volatility_config());
    let signal = generator.generate(1, &narrowing_spread_series()).unwrap();

    assert_eq!(signal.spread_score, 1.0);
    assert_eq!(signal.liquidity_score, 1.0);
    assert!(signal.confidence_score > 0.99);
    assert_eq!(signal.recommended_quantity, 3);
    assert!((signal.max_investment - signal.current_buy_price * 3.0).abs() < 1e-9);
}

#[test]
fn test_generate_respects_custom_quantities() {
    let config = StrategyConfig {
        max_multiple_quantity: 5,
        ..wide_volatility_config()
    };
    let generator = SignalGenerator::new(config);
    let signal = generator.generate(1, &narrowing_spread_series()).unwrap();
    assert_eq!(signal.recommended_quantity, 5);
}
