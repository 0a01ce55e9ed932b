//! Unit tests for parameter grids

use csquant::models::StrategyConfig;
use csquant::optimizer::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_full_grid_size_and_order() {
    let grid = ParamGrid::full(StrategyConfig::default());
    assert_eq!(grid.size(), 243);

    let candidates: Vec<StrategyConfig> = grid.combinations().collect();
    assert_eq!(candidates.len(), 243);

    let first = &candidates[0];
    assert_eq!(
        (first.trend_threshold, first.spread_threshold, first.liquidity_threshold),
        (0.5, 0.4, 0.6)
    );
    assert_eq!((first.min_profit_rate, first.max_volatility), (2.5, 12.0));

    // Last axis varies fastest.
    let second = &candidates[1];
    assert_eq!(second.max_volatility, 15.0);
    assert_eq!(second.min_profit_rate, 2.5);
    assert_eq!(candidates[3].min_profit_rate, 3.0);
    assert_eq!(candidates[81].trend_threshold, 0.6);

    let last = &candidates[242];
    assert_eq!(
        (last.trend_threshold, last.spread_threshold, last.liquidity_threshold),
        (0.7, 0.6, 0.8)
    );
    assert_eq!((last.min_profit_rate, last.max_volatility), (3.5, 18.0));
}

#[test]
fn test_grid_keeps_untuned_fields() {
    let base = StrategyConfig {
        fee_rate: 0.02,
        cooldown_days: 5,
        ..StrategyConfig::default()
    };
    for candidate in ParamGrid::full(base.clone()).combinations() {
        assert_eq!(candidate.fee_rate, 0.02);
        assert_eq!(candidate.cooldown_days, 5);
        assert_eq!(candidate.max_drawdown, base.max_drawdown);
    }
}

#[test]
fn test_neighbourhood_of_default() {
    let grid = ParamGrid::neighbourhood(StrategyConfig::default());
    assert_eq!(grid.size(), 27);
    assert_eq!(grid.axes().len(), 3);

    let trend = &grid.axes()[0];
    assert_eq!(trend.param, Param::TrendThreshold);
    assert!(close(trend.values[0], 0.5));
    assert!(close(trend.values[1], 0.6));
    assert!(close(trend.values[2], 0.7));

    // The untouched centre is the base itself.
    let centre = grid.combinations().nth(13).unwrap();
    assert_eq!(&centre, grid.base());
}

#[test]
fn test_neighbourhood_clamps_thresholds() {
    let base = StrategyConfig {
        trend_threshold: 0.85,
        spread_threshold: 0.3,
        liquidity_threshold: 0.35,
        ..StrategyConfig::default()
    };
    let grid = ParamGrid::neighbourhood(base);
    let values: Vec<Vec<f64>> = grid.axes().iter().map(|a| a.values.clone()).collect();

    assert!(close(values[0][0], 0.75));
    assert!(close(values[0][2], 0.9));
    assert!(close(values[1][0], 0.3));
    assert!(close(values[1][2], 0.4));
    assert!(close(values[2][0], 0.3));

    let (lo, hi) = THRESHOLD_BOUNDS;
    for candidate in grid.combinations() {
        for param in Param::THRESHOLDS {
            let value = param.get(&candidate);
            assert!(value >= lo && value <= hi);
        }
    }
}

#[test]
fn test_empty_and_axisless_grids() {
    let base = StrategyConfig::default();

    let axisless = ParamGrid::new(base.clone());
    let only: Vec<StrategyConfig> = axisless.combinations().collect();
    assert_eq!(only, vec![base.clone()]);

    let empty = ParamGrid::new(base).axis(Param::MaxVolatility, Vec::new());
    assert_eq!(empty.size(), 0);
    assert_eq!(empty.combinations().count(), 0);
}

#[test]
fn test_param_apply_and_get() {
    let mut config = StrategyConfig::default();
    for (i, param) in Param::ALL.iter().enumerate() {
        param.apply(&mut config, i as f64 + 0.5);
        assert_eq!(param.get(&config), i as f64 + 0.5);
    }
}

#[test]
fn test_tuned_params_lists_every_axis() {
    let params = tuned_params(&StrategyConfig::default());
    let object = params.as_object().unwrap();

    assert_eq!(object.len(), 5);
    assert_eq!(object["trend_threshold"], 0.6);
    assert_eq!(object["spread_threshold"], 0.5);
    assert_eq!(object["liquidity_threshold"], 0.7);
    assert_eq!(object["min_profit_rate"], 3.0);
    assert_eq!(object["max_volatility"], 15.0);
}
