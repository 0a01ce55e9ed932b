//! Wires the engine components behind the two background schedulers.

use crate::backtest::BacktestEngine;
use crate::config::{WorkerConfig, DEFAULT_LEARNING_CRON, DEFAULT_SIGNAL_CRON};
use crate::core::scheduler::{DailyLearningScheduler, SignalRefreshScheduler};
use crate::db::Repository;
use crate::error::QuantError;
use crate::learning::AutoLearner;
use crate::metrics::Metrics;
use crate::models::StrategyConfig;
use crate::optimizer::CancelFlag;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub signal_cron: String,
    pub learning_cron: String,
    /// Threads in the private simulation pool; 0 uses the global rayon pool.
    pub pool_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            signal_cron: DEFAULT_SIGNAL_CRON.to_string(),
            learning_cron: DEFAULT_LEARNING_CRON.to_string(),
            pool_size: 0,
        }
    }
}

impl From<&WorkerConfig> for RuntimeConfig {
    fn from(worker: &WorkerConfig) -> Self {
        Self {
            signal_cron: worker.signal_cron.clone(),
            learning_cron: worker.learning_cron.clone(),
            pool_size: worker.pool_size,
        }
    }
}

pub struct QuantRuntime {
    repository: Arc<dyn Repository>,
    metrics: Option<Arc<Metrics>>,
    pool: Option<Arc<ThreadPool>>,
    learner: Arc<AutoLearner>,
    /// Raised by [`QuantRuntime::stop`]; a running search halts at its next candidate.
    cancel: CancelFlag,
    signals: SignalRefreshScheduler,
    learning: DailyLearningScheduler,
}

impl QuantRuntime {
    pub fn new(
        config: RuntimeConfig,
        repository: Arc<dyn Repository>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self, QuantError> {
        let pool = if config.pool_size > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.pool_size)
                .thread_name(|i| format!("csquant-sim-{}", i))
                .build()
                .map_err(|e| QuantError::InvalidConfig(format!("simulation pool: {}", e)))?;
            Some(Arc::new(pool))
        } else {
            None
        };

        let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
        let learner = Arc::new(
            AutoLearner::new(repository.clone())
                .with_pool(pool.clone())
                .with_cancel(Some(cancel.clone()))
                .with_metrics(metrics.clone()),
        );
        let signals = SignalRefreshScheduler::new(repository.clone(), metrics.clone(), &config.signal_cron)?;
        let learning = DailyLearningScheduler::new(learner.clone(), &config.learning_cron)?;

        info!(
            pool_size = config.pool_size,
            signal_cron = %config.signal_cron,
            learning_cron = %config.learning_cron,
            "QuantRuntime: initialized"
        );

        Ok(Self {
            repository,
            metrics,
            pool,
            learner,
            cancel,
            signals,
            learning,
        })
    }

    pub fn learner(&self) -> Arc<AutoLearner> {
        self.learner.clone()
    }

    /// A backtest engine sharing the runtime's pool and metrics.
    pub fn backtest_engine(&self, config: StrategyConfig) -> BacktestEngine {
        BacktestEngine::new(self.repository.clone(), config)
            .with_pool(self.pool.clone())
            .with_metrics(self.metrics.clone())
    }

    pub async fn start(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        self.signals.start().await;
        self.learning.start().await;
        info!("QuantRuntime: schedulers started");
    }

    pub async fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.signals.stop().await;
        self.learning.stop().await;
        info!("QuantRuntime: schedulers stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.signals.task().is_running().await && self.learning.task().is_running().await
    }
}
