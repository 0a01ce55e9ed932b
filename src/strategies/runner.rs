//! Signal sweep over every eligible good.

use crate::db::Repository;
use crate::error::{QuantResult, Rejection};
use crate::metrics::Metrics;
use crate::models::{StrategyConfig, StrategyVersion, TradeSignal, DEFAULT_STRATEGY_VERSION};
use crate::risk::{PositionDecision, RiskManager};
use crate::signals::{SignalGenerator, MIN_SIGNAL_POINTS};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extra days of history scanned when deciding which goods are eligible.
const ELIGIBILITY_SLACK_DAYS: i64 = 7;
/// Signals logged after each refresh.
const LOGGED_TOP_SIGNALS: usize = 10;

pub struct StrategyRunner {
    repository: Arc<dyn Repository>,
    config: StrategyConfig,
    version: String,
    generator: SignalGenerator,
    risk: RiskManager,
    metrics: Option<Arc<Metrics>>,
}

impl StrategyRunner {
    pub fn new(repository: Arc<dyn Repository>, config: StrategyConfig) -> Self {
        Self {
            generator: SignalGenerator::new(config.clone()),
            risk: RiskManager::new(repository.clone(), config.clone()),
            repository,
            config,
            version: DEFAULT_STRATEGY_VERSION.to_string(),
            metrics: None,
        }
    }

    /// Runner for the repository's active version, or the default one.
    pub async fn for_active_version(repository: Arc<dyn Repository>) -> QuantResult<Self> {
        let active = repository
            .get_active_strategy_version()
            .await?
            .unwrap_or_else(|| StrategyVersion::default_active(Utc::now()));
        active.config.validate()?;
        debug!(version = %active.version, "StrategyRunner: using strategy version {}", active.version);
        Ok(Self::new(repository, active.config).with_version(active.version))
    }

    /// Stamp signals with `version` instead of the default.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn generate_signals(&self) -> QuantResult<Vec<TradeSignal>> {
        self.generate_signals_at(Utc::now()).await
    }

    /// Score every good with enough history as of `now`, strongest first.
    pub async fn generate_signals_at(&self, now: DateTime<Utc>) -> QuantResult<Vec<TradeSignal>> {
        let train_days = i64::from(self.config.train_days);
        let scan_start = now - Duration::days(train_days + ELIGIBILITY_SLACK_DAYS);
        let goods = self
            .repository
            .get_all_goods_with_sufficient_data(MIN_SIGNAL_POINTS, scan_start, now)
            .await?;

        info!(
            goods = goods.len(),
            version = %self.version,
            "StrategyRunner: evaluating {} eligible goods",
            goods.len()
        );

        let window_start = now - Duration::days(train_days);
        let mut signals = Vec::new();
        for good_id in goods {
            let snapshots = self
                .repository
                .load_historical_data(good_id, window_start, now)
                .await?;

            let candidate = match self.generator.generate(good_id, &snapshots) {
                Ok(signal) => signal,
                Err(rejection) => {
                    self.record_rejection(good_id, &rejection);
                    continue;
                }
            };

            let name = self.repository.get_good_name(good_id).await?;
            let candidate = candidate.stamped(name, &self.version, now);

            if let Err(rejection) = self.risk.validate_signal(&candidate) {
                self.record_rejection(good_id, &rejection);
                continue;
            }

            match self.risk.check_position_limit(&candidate).await? {
                PositionDecision::Approved(signal) => signals.push(signal),
                PositionDecision::Rejected(rejection) => self.record_rejection(good_id, &rejection),
            }
        }

        // Stable, so equal strengths keep repository order.
        signals.sort_by(|a, b| b.signal_strength.total_cmp(&a.signal_strength));

        if let Some(ref metrics) = self.metrics {
            metrics.signals_generated_total.inc_by(signals.len() as u64);
        }
        Ok(signals)
    }

    /// Purge expired rows, then persist `signals`.
    pub async fn save_signals(&self, signals: &[TradeSignal]) -> QuantResult<usize> {
        let saved = self.repository.save_trade_signals(signals).await?;
        debug!(saved = saved, "StrategyRunner: saved {} signals", saved);
        Ok(saved)
    }

    /// Scheduled entry point: generate, save and log the strongest signals.
    pub async fn update_signals(&self) -> QuantResult<usize> {
        let started = Instant::now();
        let signals = self.generate_signals().await?;
        let saved = self.save_signals(&signals).await?;

        for (rank, signal) in signals.iter().take(LOGGED_TOP_SIGNALS).enumerate() {
            info!(
                rank = rank + 1,
                good_id = signal.good_id,
                good_name = %signal.good_name,
                strength = signal.signal_strength,
                profit_rate = signal.predicted_profit_rate,
                quantity = signal.recommended_quantity,
                "StrategyRunner: #{} {} strength {:.1}, expected profit {:.2}%",
                rank + 1,
                signal.good_name,
                signal.signal_strength,
                signal.predicted_profit_rate
            );
        }

        if let Some(ref metrics) = self.metrics {
            metrics
                .signal_refresh_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }
        info!(saved = saved, "StrategyRunner: signal refresh complete, {} signals saved", saved);
        Ok(saved)
    }

    /// The `n` strongest current signals.
    pub async fn top_signals(&self, n: usize) -> QuantResult<Vec<TradeSignal>> {
        let mut signals = self.generate_signals().await?;
        signals.truncate(n);
        Ok(signals)
    }

    fn record_rejection(&self, good_id: i64, rejection: &Rejection) {
        match rejection {
            Rejection::SanityViolation(_) => {
                warn!(good_id = good_id, reason = %rejection, "StrategyRunner: sanity violation for good {}", good_id)
            }
            _ => debug!(good_id = good_id, reason = %rejection, "StrategyRunner: no signal for good {}", good_id),
        }
        if let Some(ref metrics) = self.metrics {
            metrics
                .signal_rejections_total
                .with_label_values(&[rejection.kind()])
                .inc();
        }
    }
}
