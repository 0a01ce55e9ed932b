use crate::backtest::BacktestEngine;
use crate::db::Repository;
use crate::error::QuantResult;
use crate::learning::promotion::{ManualPromotion, PromotionDecision, PromotionPolicy};
use crate::metrics::Metrics;
use crate::models::{LearningLog, LearningStatus, StrategyConfig, StrategyStatus, StrategyVersion};
use crate::optimizer::{tuned_params, CancelFlag, Optimization, Optimizer};
use chrono::{DateTime, Duration, Local, Utc};
use rayon::ThreadPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Days of history each learning run optimizes over.
pub const LEARNING_WINDOW_DAYS: i64 = 30;

/// `"YYYY-MM-DD to YYYY-MM-DD"`.
pub fn data_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

pub struct AutoLearner {
    repository: Arc<dyn Repository>,
    policy: Box<dyn PromotionPolicy>,
    pool: Option<Arc<ThreadPool>>,
    cancel: Option<CancelFlag>,
    metrics: Option<Arc<Metrics>>,
}

impl AutoLearner {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            policy: Box::new(ManualPromotion),
            pool: None,
            cancel: None,
            metrics: None,
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn PromotionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pool(mut self, pool: Option<Arc<ThreadPool>>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelFlag>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub async fn run_daily_learning(&self) -> QuantResult<StrategyVersion> {
        self.run_daily_learning_at(Local::now()).await
    }

    /// One learning run over the 30 days before `now`.
    ///
    /// Any failure is recorded as a failed learning log and then returned.
    pub async fn run_daily_learning_at(&self, now: DateTime<Local>) -> QuantResult<StrategyVersion> {
        let started = Instant::now();
        let end = now.with_timezone(&Utc);
        let start = end - Duration::days(LEARNING_WINDOW_DAYS);
        let range = data_range(start, end);
        info!(data_range = %range, "AutoLearner: starting daily learning over {}", range);

        let outcome = self.learn(start, end, now).await;

        let status = if outcome.is_ok() {
            LearningStatus::Success
        } else {
            LearningStatus::Failed
        };
        if let Some(ref metrics) = self.metrics {
            metrics
                .learning_runs_total
                .with_label_values(&[status.as_str()])
                .inc();
            metrics
                .learning_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }

        match outcome {
            Ok((version, optimization)) => {
                let log = LearningLog {
                    learning_time: end,
                    data_range: range,
                    best_params: Some(tuned_params(&optimization.config)),
                    backtest_sharpe_ratio: Some(optimization.result.sharpe_ratio),
                    backtest_return_rate: Some(optimization.result.total_return_rate),
                    backtest_win_rate: Some(optimization.result.win_rate),
                    status: LearningStatus::Success,
                    error_message: None,
                };
                if let Err(e) = self.repository.append_learning_log(&log).await {
                    warn!(error = %e, "AutoLearner: failed to record learning log");
                }
                info!(
                    version = %version.version,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "AutoLearner: daily learning complete, {} is now validating",
                    version.version
                );
                Ok(version)
            }
            Err(e) => {
                error!(error = %e, "AutoLearner: daily learning failed: {}", e);
                let log = LearningLog::failed(end, range, e.to_string());
                if let Err(log_err) = self.repository.append_learning_log(&log).await {
                    error!(error = %log_err, "AutoLearner: failed to record learning failure");
                }
                Err(e)
            }
        }
    }

    async fn learn(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Local>,
    ) -> QuantResult<(StrategyVersion, Optimization)> {
        let base = match self.repository.get_active_strategy_version().await? {
            Some(active) => active.config,
            None => {
                info!("AutoLearner: no active version, starting from the default config");
                StrategyConfig::default()
            }
        };
        base.validate()?;

        let optimizer = Optimizer::new(self.repository.clone())
            .with_pool(self.pool.clone())
            .with_cancel(self.cancel.clone())
            .with_metrics(self.metrics.clone());
        let optimization = optimizer.quick_optimize(start, end, &base).await?;

        let engine = BacktestEngine::new(self.repository.clone(), optimization.config.clone());
        engine.validate_strategy(&optimization.result)?;

        let blacklisted = engine.identify_losing_goods(&optimization.result).await;
        info!(blacklisted = blacklisted, "AutoLearner: blacklist refreshed");

        let version = StrategyVersion::training(
            StrategyVersion::name_for(now),
            optimization.config.clone(),
            end,
        )
        .into_validating(optimization.result.summary(), end);
        let id = self.repository.save_strategy_version(&version).await?;

        Ok((StrategyVersion { id: Some(id), ..version }, optimization))
    }

    /// Apply the promotion policy to every `validating` version.
    pub async fn check_validating(&self) -> QuantResult<Vec<(String, PromotionDecision)>> {
        let now = Utc::now();
        let validating = self
            .repository
            .list_strategy_versions(StrategyStatus::Validating)
            .await?;
        info!(count = validating.len(), "AutoLearner: checking {} validating versions", validating.len());

        let mut decisions = Vec::with_capacity(validating.len());
        for version in validating {
            let decision = self.policy.decide(&version, now);
            match decision {
                PromotionDecision::Keep => {}
                PromotionDecision::Promote => self.promote(&version.version).await?,
                PromotionDecision::Reject => {
                    self.repository
                        .update_strategy_status(&version.version, StrategyStatus::Archived)
                        .await?;
                    info!(version = %version.version, "AutoLearner: archived {}", version.version);
                }
            }
            decisions.push((version.version, decision));
        }
        Ok(decisions)
    }

    async fn promote(&self, version: &str) -> QuantResult<()> {
        if let Some(current) = self.repository.get_active_strategy_version().await? {
            if current.version != version {
                self.repository
                    .update_strategy_status(&current.version, StrategyStatus::Archived)
                    .await?;
            }
        }
        self.repository
            .update_strategy_status(version, StrategyStatus::Active)
            .await?;
        info!(version = %version, "AutoLearner: promoted {} to active", version);
        Ok(())
    }
}
