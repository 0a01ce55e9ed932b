//! Integration tests for backtesting and blacklist feedback

use crate::test_utils::{flat, learning_repo, sawtooth, seeded_repo};
use chrono::{Duration, TimeZone, Utc};
use csquant::backtest::BacktestEngine;
use csquant::db::Repository;
use csquant::metrics::Metrics;
use csquant::models::StrategyConfig;
use csquant::risk::{PositionDecision, RiskManager};
use csquant::signals::SignalGenerator;
use csquant::Rejection;
use std::sync::Arc;

#[tokio::test]
async fn losing_good_is_blacklisted_and_then_refused() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let repo = seeded_repo(vec![sawtooth(7, 1440, now)]).await;
    let metrics = Arc::new(Metrics::new().unwrap());

    let engine = BacktestEngine::new(repo.clone(), StrategyConfig::default()).with_metrics(Some(metrics.clone()));
    let result = engine.run_backtest(now - Duration::days(60), now).await.unwrap();

    assert_eq!(result.total_trades, 5);
    assert_eq!(result.winning_trades, 0);
    assert!(result.trades.iter().all(|t| (t.profit_rate + 10.07).abs() < 0.01));
    assert!((result.profits_by_good[&7] + 11.66).abs() < 0.01);
    assert_eq!(result.losing_goods().len(), 1);
    assert_eq!(metrics.backtest_runs_total.get(), 1);
    assert_eq!(metrics.backtest_trades_total.get(), 5);

    assert_eq!(engine.identify_losing_goods(&result).await, 1);
    let entry = repo.get_blacklist_entry(7).await.unwrap().unwrap();
    assert_eq!(entry.reason, "backtest loss: -11.66");
    assert_eq!(entry.loss_count, 1);

    // A signal on the same good is now refused regardless of its merit.
    let window = repo
        .load_historical_data(7, now - Duration::hours(167 + 30), now - Duration::hours(30))
        .await
        .unwrap();
    let generator = SignalGenerator::new(StrategyConfig::default());
    let signal = generator.generate(7, &window).unwrap();

    let risk = RiskManager::new(repo.clone(), StrategyConfig::default());
    match risk.check_position_limit(&signal).await.unwrap() {
        PositionDecision::Rejected(Rejection::PositionConstraint(reason)) => {
            assert!(reason.contains("blacklisted"))
        }
        other => panic!("expected blacklist rejection, got {:?}", other),
    }

    // Repeat offences accumulate.
    engine.identify_losing_goods(&result).await;
    assert_eq!(repo.get_blacklist_entry(7).await.unwrap().unwrap().loss_count, 2);
}

#[tokio::test]
async fn profitable_goods_stay_off_the_blacklist() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let repo = learning_repo(now).await;

    let engine = BacktestEngine::new(repo.clone(), StrategyConfig::default());
    let result = engine.run_backtest(now - Duration::days(30), now).await.unwrap();

    assert_eq!(result.total_trades, 12);
    assert_eq!(result.win_rate, 100.0);
    assert!((result.total_return_rate - 19.65).abs() < 0.01);
    assert!((result.sharpe_ratio - 6.92).abs() < 0.01);
    assert_eq!(result.max_drawdown, 0.0);
    assert!(engine.validate_strategy(&result).is_ok());

    assert_eq!(engine.identify_losing_goods(&result).await, 0);
    assert!(repo.blacklist().await.is_empty());
}

#[tokio::test]
async fn blacklist_write_failures_are_tolerated() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let repo = seeded_repo(vec![sawtooth(7, 1440, now)]).await;

    let engine = BacktestEngine::new(repo.clone(), StrategyConfig::default());
    let result = engine.run_backtest(now - Duration::days(60), now).await.unwrap();

    repo.set_unavailable(true);
    assert_eq!(engine.identify_losing_goods(&result).await, 0);
}

#[tokio::test]
async fn empty_window_backtests_to_nothing() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let repo = seeded_repo(vec![flat(1, 720, now)]).await;

    let engine = BacktestEngine::new(repo, StrategyConfig::default());
    // The data sits entirely after this window.
    let result = engine
        .run_backtest(now - Duration::days(90), now - Duration::days(60))
        .await
        .unwrap();

    assert_eq!(result.total_trades, 0);
    assert!(result.trades.is_empty());
}
