//! Test utilities for engine integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use csquant::db::InMemoryRepository;
use csquant::models::{PriceSnapshot, StrategyConfig, StrategyVersion};
use std::sync::Arc;

/// `n` hourly samples ending at `end`, sell priced by `sell_at(i)` and buy
/// 5% under it.
pub fn hourly_series(
    good_id: i64,
    n: usize,
    end: DateTime<Utc>,
    sell_at: impl Fn(usize) -> f64,
) -> Vec<PriceSnapshot> {
    (0..n)
        .map(|i| {
            let sell = sell_at(i);
            PriceSnapshot::new(good_id, sell, sell / 1.05, end - Duration::hours((n - 1 - i) as i64))
                .with_counts(80, 20)
        })
        .collect()
}

/// Steady compounding climb.
pub fn rising(good_id: i64, n: usize, base: f64, rate: f64, end: DateTime<Utc>) -> Vec<PriceSnapshot> {
    hourly_series(good_id, n, end, |i| base * (1.0 + rate).powi(i as i32))
}

/// Climbs for ten days, then crashes back to the start. Every signal it
/// produces is bought near a peak and sold after the crash.
pub fn sawtooth(good_id: i64, n: usize, end: DateTime<Utc>) -> Vec<PriceSnapshot> {
    hourly_series(good_id, n, end, |i| 20.0 * 1.002_f64.powi((i % 240) as i32))
}

/// Constant price with no spread; never scores.
pub fn flat(good_id: i64, n: usize, end: DateTime<Utc>) -> Vec<PriceSnapshot> {
    (0..n)
        .map(|i| {
            PriceSnapshot::new(good_id, 10.0, 10.0, end - Duration::hours((n - 1 - i) as i64))
                .with_counts(80, 20)
        })
        .collect()
}

/// Default thresholds with room for the volatility of a steady 0.5%/h climb.
pub fn wide_volatility_config() -> StrategyConfig {
    StrategyConfig {
        max_volatility: 35.0,
        ..StrategyConfig::default()
    }
}

pub async fn seeded_repo(series: Vec<Vec<PriceSnapshot>>) -> Arc<InMemoryRepository> {
    let repo = Arc::new(InMemoryRepository::new());
    for snapshots in series {
        repo.insert_snapshots(snapshots).await;
    }
    repo
}

/// Four goods climbing at slightly different rates over 30 days. The
/// default config backtests them to 12 winning trades.
pub async fn learning_repo(end: DateTime<Utc>) -> Arc<InMemoryRepository> {
    seeded_repo(
        [(1, 0.0015), (2, 0.0018), (3, 0.002), (4, 0.0022)]
            .into_iter()
            .map(|(id, rate)| rising(id, 720, 20.0, rate, end))
            .collect(),
    )
    .await
}

pub fn active_version(name: &str, config: StrategyConfig, now: DateTime<Utc>) -> StrategyVersion {
    StrategyVersion {
        version: name.to_string(),
        config,
        ..StrategyVersion::default_active(now)
    }
}
