use crate::backtest::metrics::summarize;
use crate::backtest::state::{replay, LOOKBACK};
use crate::db::Repository;
use crate::error::{QuantError, QuantResult};
use crate::metrics::Metrics;
use crate::models::{BacktestResult, BacktestTrade, PriceSnapshot, StrategyConfig};
use crate::signals::SignalGenerator;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, warn};

pub const MIN_VALIDATION_TRADES: usize = 10;
pub const MIN_VALIDATION_WIN_RATE: f64 = 60.0;
pub const MIN_VALIDATION_SHARPE: f64 = 0.5;

/// One good's ordered history, loaded once and shared by every simulation.
#[derive(Debug, Clone)]
pub struct GoodHistory {
    pub good_id: i64,
    pub good_name: String,
    pub snapshots: Vec<PriceSnapshot>,
}

#[derive(Debug, Clone)]
pub struct BacktestDataset {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Repository order; simulation output follows it.
    pub goods: Vec<GoodHistory>,
}

impl BacktestDataset {
    pub fn snapshot_count(&self) -> usize {
        self.goods.iter().map(|g| g.snapshots.len()).sum()
    }
}

#[derive(Clone)]
pub struct BacktestEngine {
    repository: Arc<dyn Repository>,
    config: StrategyConfig,
    pool: Option<Arc<ThreadPool>>,
    metrics: Option<Arc<Metrics>>,
}

impl BacktestEngine {
    pub fn new(repository: Arc<dyn Repository>, config: StrategyConfig) -> Self {
        Self {
            repository,
            config,
            pool: None,
            metrics: None,
        }
    }

    /// Run simulations on a private pool instead of the global one.
    pub fn with_pool(mut self, pool: Option<Arc<ThreadPool>>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Run `op` inside the private pool when one is set, so nested parallel
    /// iterators stay within its thread bound.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match self.pool {
            Some(ref pool) => pool.install(op),
            None => op(),
        }
    }

    /// Same engine, different tunables. Shares the repository, pool and metrics.
    pub fn with_config(&self, config: StrategyConfig) -> Self {
        Self {
            repository: self.repository.clone(),
            config,
            pool: self.pool.clone(),
            metrics: self.metrics.clone(),
        }
    }

    fn min_snapshots(&self) -> usize {
        self.config.cooldown_hours() + LOOKBACK
    }

    pub async fn run_backtest(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> QuantResult<BacktestResult> {
        let dataset = self.load_dataset(start, end).await?;
        self.simulate_blocking(Arc::new(dataset)).await
    }

    /// Load every good holding at least `cooldown + lookback` snapshots in range.
    pub async fn load_dataset(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> QuantResult<BacktestDataset> {
        let min_snapshots = self.min_snapshots();
        let good_ids = self
            .repository
            .get_all_goods_with_sufficient_data(min_snapshots, start, end)
            .await?;

        info!(
            goods = good_ids.len(),
            start = %start.format("%Y-%m-%d"),
            end = %end.format("%Y-%m-%d"),
            "BacktestEngine: loading {} goods for {} to {}",
            good_ids.len(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let mut goods = Vec::with_capacity(good_ids.len());
        for (i, good_id) in good_ids.into_iter().enumerate() {
            if i > 0 && i % 100 == 0 {
                debug!(loaded = i, "BacktestEngine: loaded {} goods", i);
            }
            let snapshots = self.repository.load_historical_data(good_id, start, end).await?;
            if snapshots.len() < min_snapshots {
                debug!(
                    good_id = good_id,
                    snapshots = snapshots.len(),
                    "BacktestEngine: skipping good {} with insufficient data",
                    good_id
                );
                continue;
            }
            let good_name = self.repository.get_good_name(good_id).await?;
            goods.push(GoodHistory {
                good_id,
                good_name,
                snapshots,
            });
        }

        Ok(BacktestDataset { start, end, goods })
    }

    /// Replay the signal generator over `dataset`. Pure and deterministic:
    /// goods fan out across the pool and trades are folded back in dataset order.
    pub fn simulate(&self, dataset: &BacktestDataset) -> BacktestResult {
        let generator = SignalGenerator::new(self.config.clone());
        let run = || -> Vec<Vec<BacktestTrade>> {
            dataset
                .goods
                .par_iter()
                .map(|good| self.trades_for(&generator, good))
                .collect()
        };
        let per_good = self.install(run);

        let result = summarize(per_good.into_iter().flatten().collect());

        if let Some(ref metrics) = self.metrics {
            metrics.backtest_runs_total.inc();
            metrics.backtest_trades_total.inc_by(result.total_trades as u64);
        }
        info!(
            trades = result.total_trades,
            winning = result.winning_trades,
            losing = result.losing_trades,
            win_rate = result.win_rate,
            total_return = result.total_return,
            "BacktestEngine: {} trades, win rate {:.1}%, total return {:.2}",
            result.total_trades,
            result.win_rate,
            result.total_return
        );
        result
    }

    /// [`simulate`](Self::simulate) on tokio's blocking threads. Async workers
    /// stay free while the replay runs.
    pub async fn simulate_blocking(&self, dataset: Arc<BacktestDataset>) -> QuantResult<BacktestResult> {
        let engine = self.clone();
        Ok(task::spawn_blocking(move || engine.simulate(&dataset)).await?)
    }

    fn trades_for(&self, generator: &SignalGenerator, good: &GoodHistory) -> Vec<BacktestTrade> {
        let snapshots = &good.snapshots;
        if snapshots.len() < self.min_snapshots() {
            return Vec::new();
        }

        let fee = self.config.fee_rate;
        let rounds = replay(snapshots.len(), self.config.cooldown_hours(), |i| {
            generator
                .generate(good.good_id, &snapshots[i - LOOKBACK..=i])
                .ok()
                .map(|signal| signal.signal_strength)
        });

        rounds
            .into_iter()
            .map(|round| {
                let bought = &snapshots[round.entry];
                let sold = &snapshots[round.exit];
                BacktestTrade {
                    good_id: good.good_id,
                    good_name: good.good_name.clone(),
                    buy_time: bought.timestamp,
                    buy_price: bought.buy_price,
                    sell_time: sold.timestamp,
                    sell_price: sold.sell_price,
                    profit_rate: (sold.sell_price / bought.buy_price - 1.0 - fee) * 100.0,
                    net_profit: (sold.sell_price - bought.buy_price) * (1.0 - fee),
                    holding_days: self.config.cooldown_days,
                    signal_strength: round.payload,
                }
            })
            .collect()
    }

    /// All five gates must hold at once; the first miss is reported.
    pub fn validate_strategy(&self, result: &BacktestResult) -> QuantResult<()> {
        let failure = if result.total_trades < MIN_VALIDATION_TRADES {
            Some(format!(
                "too few trades ({} < {})",
                result.total_trades, MIN_VALIDATION_TRADES
            ))
        } else if result.win_rate < MIN_VALIDATION_WIN_RATE {
            Some(format!(
                "win rate too low ({:.1}% < {:.0}%)",
                result.win_rate, MIN_VALIDATION_WIN_RATE
            ))
        } else if result.total_return_rate <= 0.0 {
            Some(format!("non-positive return rate ({:.2}%)", result.total_return_rate))
        } else if result.max_drawdown > self.config.max_drawdown {
            Some(format!(
                "max drawdown too deep ({:.2}% > {:.2}%)",
                result.max_drawdown, self.config.max_drawdown
            ))
        } else if result.sharpe_ratio < MIN_VALIDATION_SHARPE {
            Some(format!(
                "sharpe ratio too low ({:.2} < {:.1})",
                result.sharpe_ratio, MIN_VALIDATION_SHARPE
            ))
        } else {
            None
        };

        match failure {
            Some(reason) => {
                warn!(reason = %reason, "BacktestEngine: strategy validation failed: {}", reason);
                Err(QuantError::ValidationFailed(reason))
            }
            None => {
                info!(
                    win_rate = result.win_rate,
                    return_rate = result.total_return_rate,
                    sharpe = result.sharpe_ratio,
                    max_drawdown = result.max_drawdown,
                    "BacktestEngine: strategy validated"
                );
                Ok(())
            }
        }
    }

    /// Blacklist every good whose summed backtest profit is negative.
    /// Returns the number of goods added; individual write failures are logged.
    pub async fn identify_losing_goods(&self, result: &BacktestResult) -> usize {
        let mut added = 0;
        for (good_id, profit) in result.losing_goods() {
            let reason = format!("backtest loss: {:.2}", profit);
            match self.repository.add_to_blacklist(good_id, &reason).await {
                Ok(()) => {
                    info!(good_id = good_id, loss = profit, "BacktestEngine: blacklisted good {}", good_id);
                    added += 1;
                }
                Err(e) => {
                    warn!(good_id = good_id, error = %e, "BacktestEngine: failed to blacklist good {}", good_id);
                }
            }
        }
        info!(added = added, "BacktestEngine: {} goods added to blacklist", added);
        added
    }
}
