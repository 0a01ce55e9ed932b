use crate::backtest::{BacktestDataset, BacktestEngine};
use crate::db::Repository;
use crate::error::{QuantError, QuantResult};
use crate::metrics::Metrics;
use crate::models::{BacktestResult, StrategyConfig};
use crate::optimizer::grid::ParamGrid;
use crate::optimizer::objective::{DefaultObjective, Objective};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info};

/// Set to abort a running search. Checked before each candidate starts.
pub type CancelFlag = Arc<AtomicBool>;

/// Winning configuration of a search and its backtest.
#[derive(Debug, Clone)]
pub struct Optimization {
    pub config: StrategyConfig,
    pub result: BacktestResult,
    /// `None` when the quick search fell back to the baseline.
    pub score: Option<f64>,
    pub evaluated: usize,
}

#[derive(Clone)]
pub struct Optimizer {
    engine: BacktestEngine,
    objective: Arc<dyn Objective>,
    cancel: Option<CancelFlag>,
}

impl Optimizer {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            engine: BacktestEngine::new(repository, StrategyConfig::default()),
            objective: Arc::new(DefaultObjective),
            cancel: None,
        }
    }

    pub fn with_objective(mut self, objective: Box<dyn Objective>) -> Self {
        self.objective = Arc::from(objective);
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelFlag>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_pool(mut self, pool: Option<Arc<ThreadPool>>) -> Self {
        self.engine = self.engine.with_pool(pool);
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.engine = self.engine.with_metrics(metrics);
        self
    }

    /// Exhaustive search over [`ParamGrid::full`] on top of the default config.
    pub async fn optimize_parameters(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> QuantResult<Optimization> {
        let grid = ParamGrid::full(StrategyConfig::default());
        info!(candidates = grid.size(), "Optimizer: starting full grid search over {} candidates", grid.size());

        let dataset = self.engine.with_config(grid.base().clone()).load_dataset(start, end).await?;
        let evaluated = grid.size();
        match self.search_blocking(grid, Arc::new(dataset)).await? {
            Some(best) => {
                info!(
                    score = best.score.unwrap_or_default(),
                    trend = best.config.trend_threshold,
                    spread = best.config.spread_threshold,
                    liquidity = best.config.liquidity_threshold,
                    min_profit = best.config.min_profit_rate,
                    max_volatility = best.config.max_volatility,
                    "Optimizer: grid search complete"
                );
                Ok(best)
            }
            None => Err(QuantError::OptimizationExhausted { evaluated }),
        }
    }

    /// Local search around `base`; re-backtests `base` itself when no
    /// neighbour qualifies.
    pub async fn quick_optimize(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        base: &StrategyConfig,
    ) -> QuantResult<Optimization> {
        let grid = ParamGrid::neighbourhood(base.clone());
        debug!(candidates = grid.size(), "Optimizer: starting quick search");

        let baseline = self.engine.with_config(base.clone());
        let dataset = Arc::new(baseline.load_dataset(start, end).await?);
        let evaluated = grid.size();
        if let Some(best) = self.search_blocking(grid, dataset.clone()).await? {
            info!(
                score = best.score.unwrap_or_default(),
                sharpe = best.result.sharpe_ratio,
                return_rate = best.result.total_return_rate,
                max_drawdown = best.result.max_drawdown,
                "Optimizer: quick search found a better neighbour"
            );
            return Ok(best);
        }

        info!("Optimizer: no neighbour qualified, keeping the current config");
        let result = baseline.simulate_blocking(dataset).await?;
        Ok(Optimization {
            config: base.clone(),
            result,
            score: None,
            evaluated,
        })
    }

    /// Runs [`search`](Self::search) on tokio's blocking threads so a long
    /// grid never stalls the async workers.
    async fn search_blocking(
        &self,
        grid: ParamGrid,
        dataset: Arc<BacktestDataset>,
    ) -> QuantResult<Option<Optimization>> {
        let optimizer = self.clone();
        task::spawn_blocking(move || optimizer.search(&grid, &dataset)).await?
    }

    /// Backtest every candidate of `grid` on `dataset`. The best eligible
    /// candidate wins; ties keep the earliest in grid order.
    fn search(&self, grid: &ParamGrid, dataset: &BacktestDataset) -> QuantResult<Option<Optimization>> {
        let candidates: Vec<StrategyConfig> = grid.combinations().collect();
        let total = candidates.len();

        let scored: Vec<Option<(StrategyConfig, BacktestResult)>> = self.engine.install(|| {
            candidates
                .into_par_iter()
                .map(|config| {
                    if self.is_cancelled() {
                        return None;
                    }
                    let result = self.engine.with_config(config.clone()).simulate(dataset);
                    Some((config, result))
                })
                .collect()
        });

        if self.is_cancelled() {
            info!("Optimizer: search cancelled");
            return Err(QuantError::Cancelled);
        }

        let mut best: Option<Optimization> = None;
        for (config, result) in scored.into_iter().flatten() {
            if !self.objective.is_eligible(&result, &config) {
                continue;
            }
            let score = self.objective.score(&result);
            let improves = best
                .as_ref()
                .and_then(|b| b.score)
                .map_or(true, |current| score > current);
            if improves {
                debug!(
                    score = score,
                    sharpe = result.sharpe_ratio,
                    return_rate = result.total_return_rate,
                    win_rate = result.win_rate,
                    "Optimizer: new best candidate"
                );
                best = Some(Optimization {
                    config,
                    result,
                    score: Some(score),
                    evaluated: total,
                });
            }
        }
        Ok(best)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
