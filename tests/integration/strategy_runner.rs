//! Integration tests for the signal sweep

use crate::test_utils::{active_version, flat, rising, seeded_repo, wide_volatility_config};
use chrono::{Duration, TimeZone, Utc};
use csquant::db::{InMemoryRepository, Repository};
use csquant::metrics::Metrics;
use csquant::models::{PriceSnapshot, TradeSignal};
use csquant::strategies::StrategyRunner;
use csquant::QuantError;
use std::sync::Arc;

fn with_counts(snapshots: Vec<PriceSnapshot>, sell: u32, buy: u32) -> Vec<PriceSnapshot> {
    snapshots.into_iter().map(|s| s.with_counts(sell, buy)).collect()
}

#[tokio::test]
async fn runner_emits_signal_for_steady_climb() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let repo = seeded_repo(vec![rising(1, 200, 5.0, 0.005, now)]).await;

    let runner = StrategyRunner::new(repo.clone(), wide_volatility_config()).with_version("v20240301_020000");
    let signals = runner.generate_signals_at(now).await.unwrap();

    assert_eq!(signals.len(), 1);
    let signal = &signals[0];
    assert_eq!(signal.good_id, 1);
    assert_eq!(signal.good_name, "Good_1");
    assert_eq!(signal.strategy_version, "v20240301_020000");
    assert_eq!(signal.signal_time, now);
    assert_eq!(signal.expires_at, now + Duration::hours(1));
    assert_eq!(signal.recommended_quantity, 1);
    assert!((signal.max_investment - 12.85).abs() < 0.01);
    assert!((signal.signal_strength - 87.8).abs() < 0.05);
}

#[tokio::test]
async fn runner_skips_good_at_holding_cap() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let repo = seeded_repo(vec![rising(1, 200, 5.0, 0.005, now)]).await;
    repo.set_holding(1, 3).await;
    let metrics = Arc::new(Metrics::new().unwrap());

    let runner = StrategyRunner::new(repo.clone(), wide_volatility_config()).with_metrics(Some(metrics.clone()));
    let signals = runner.generate_signals_at(now).await.unwrap();

    assert!(signals.is_empty());
    assert_eq!(
        metrics
            .signal_rejections_total
            .with_label_values(&["position_constraint"])
            .get(),
        1
    );
    assert_eq!(metrics.signals_generated_total.get(), 0);
}

#[tokio::test]
async fn runner_orders_by_strength() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    // Good 1 has thinner listings, so the repository lists it first but it
    // scores lower on liquidity.
    let repo = seeded_repo(vec![
        with_counts(rising(1, 200, 5.0, 0.005, now), 30, 20),
        rising(2, 200, 5.0, 0.005, now),
        flat(3, 200, now),
    ])
    .await;
    let metrics = Arc::new(Metrics::new().unwrap());

    let runner = StrategyRunner::new(repo, wide_volatility_config()).with_metrics(Some(metrics.clone()));
    let signals = runner.generate_signals_at(now).await.unwrap();

    let ids: Vec<i64> = signals.iter().map(|s| s.good_id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert!((signals[1].signal_strength - 80.8).abs() < 0.05);
    assert!(signals[0].signal_strength > signals[1].signal_strength);

    assert_eq!(metrics.signals_generated_total.get(), 2);
    assert_eq!(
        metrics
            .signal_rejections_total
            .with_label_values(&["threshold_not_met"])
            .get(),
        1
    );

    let exposition = metrics.render();
    assert!(exposition.contains("csquant_signals_generated_total 2"));
    assert!(exposition.contains("kind=\"threshold_not_met\""));
}

#[tokio::test]
async fn runner_ignores_goods_without_a_week_of_history() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let repo = seeded_repo(vec![rising(1, 150, 5.0, 0.005, now)]).await;

    let runner = StrategyRunner::new(repo, wide_volatility_config());
    assert!(runner.generate_signals_at(now).await.unwrap().is_empty());
}

#[tokio::test]
async fn runner_drops_implausible_forecast() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    // A 20-unit base climbing 0.5%/h forecasts more than a 50% weekly gain.
    let mut snapshots = rising(1, 200, 20.0, 0.005, now);
    let last = snapshots.len() - 1;
    snapshots[last].buy_price = snapshots[last].sell_price / 1.02;
    let repo = seeded_repo(vec![snapshots]).await;
    let metrics = Arc::new(Metrics::new().unwrap());

    let runner = StrategyRunner::new(repo, wide_volatility_config()).with_metrics(Some(metrics.clone()));
    assert!(runner.generate_signals_at(now).await.unwrap().is_empty());
    assert_eq!(
        metrics
            .signal_rejections_total
            .with_label_values(&["sanity_violation"])
            .get(),
        1
    );
}

#[tokio::test]
async fn update_signals_persists_and_purges_expired() {
    let now = Utc::now();
    let repo = seeded_repo(vec![
        rising(1, 200, 5.0, 0.005, now),
        with_counts(rising(2, 200, 5.0, 0.005, now), 30, 20),
    ])
    .await;

    let runner = StrategyRunner::new(repo.clone(), wide_volatility_config());
    let stale = runner
        .generate_signals_at(now - Duration::hours(3))
        .await
        .unwrap()
        .into_iter()
        .map(|s| TradeSignal {
            expires_at: now - Duration::hours(2),
            ..s
        })
        .collect::<Vec<_>>();
    repo.save_trade_signals(&stale).await.unwrap();

    let saved = runner.update_signals().await.unwrap();
    assert_eq!(saved, 2);

    let stored = repo.signals().await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|s| !s.is_expired(now)));
}

#[tokio::test]
async fn top_signals_truncates() {
    let now = Utc::now();
    let repo = seeded_repo(vec![
        with_counts(rising(1, 200, 5.0, 0.005, now), 30, 20),
        rising(2, 200, 5.0, 0.005, now),
    ])
    .await;

    let runner = StrategyRunner::new(repo, wide_volatility_config());
    let top = runner.top_signals(1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].good_id, 2);
}

#[tokio::test]
async fn runner_uses_active_version() {
    let now = Utc::now();
    let repo = seeded_repo(vec![rising(1, 200, 5.0, 0.005, now)]).await;
    repo.insert_strategy_version(active_version("v20240301_020000", wide_volatility_config(), now))
        .await;

    let runner = StrategyRunner::for_active_version(repo.clone()).await.unwrap();
    assert_eq!(runner.version(), "v20240301_020000");
    assert_eq!(runner.config().max_volatility, 35.0);

    let signals = runner.generate_signals().await.unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].strategy_version, "v20240301_020000");
}

#[tokio::test]
async fn runner_falls_back_to_default_version() {
    let repo = Arc::new(InMemoryRepository::new());
    let runner = StrategyRunner::for_active_version(repo).await.unwrap();
    assert_eq!(runner.version(), "v1.0.0");
}

#[tokio::test]
async fn runner_propagates_repository_failure() {
    let now = Utc::now();
    let repo = seeded_repo(vec![rising(1, 200, 5.0, 0.005, now)]).await;
    repo.set_unavailable(true);

    let runner = StrategyRunner::new(repo.clone(), wide_volatility_config());
    assert!(matches!(runner.generate_signals().await, Err(QuantError::Repository(_))));
    assert!(matches!(runner.update_signals().await, Err(QuantError::Repository(_))));
    assert!(matches!(
        StrategyRunner::for_active_version(repo).await,
        Err(QuantError::Repository(_))
    ));
}
