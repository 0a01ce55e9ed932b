//! Cron-driven background tasks for signal refresh and daily learning.

use crate::db::Repository;
use crate::error::QuantError;
use crate::learning::AutoLearner;
use crate::metrics::Metrics;
use crate::strategies::StrategyRunner;
use chrono::{DateTime, Local};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A long-lived task that sleeps until each fire time of its schedule and
/// runs its job. Runs never overlap: the next sleep starts after the job ends.
pub struct CronTask {
    name: &'static str,
    schedule: Schedule,
    run_on_start: bool,
    shutdown: watch::Sender<bool>,
    handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl CronTask {
    pub fn new(name: &'static str, cron_expr: &str) -> Result<Self, QuantError> {
        let schedule = Schedule::from_str(cron_expr).map_err(|e| {
            QuantError::InvalidConfig(format!("invalid cron expression '{}': {}", cron_expr, e))
        })?;
        let (shutdown, _) = watch::channel(false);

        info!(task = name, cron = %cron_expr, "CronTask: {} scheduled with '{}'", name, cron_expr);
        Ok(Self {
            name,
            schedule,
            run_on_start: false,
            shutdown,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Also run the job once as soon as the task starts.
    pub fn run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// First fire time strictly after `after`.
    pub fn next_run(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.after(&after).next()
    }

    pub async fn start<F, Fut>(&self, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.handle.write().await;
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!(task = self.name, "CronTask: {} already running", self.name);
            return;
        }

        self.shutdown.send_replace(false);
        let mut shutdown = self.shutdown.subscribe();
        let schedule = self.schedule.clone();
        let name = self.name;
        let run_on_start = self.run_on_start;

        *guard = Some(tokio::spawn(async move {
            info!(task = name, "CronTask: {} started", name);
            if run_on_start {
                job().await;
            }

            loop {
                let now = Local::now();
                let Some(next) = schedule.after(&now).next() else {
                    warn!(task = name, "CronTask: {} has no upcoming fire time, exiting", name);
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                info!(
                    task = name,
                    next_run = %next.format("%Y-%m-%d %H:%M:%S"),
                    wait_secs = wait.as_secs(),
                    "CronTask: {} next run at {}",
                    name,
                    next.format("%Y-%m-%d %H:%M:%S")
                );

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.changed() => {
                        info!(task = name, "CronTask: {} received shutdown", name);
                        break;
                    }
                }
                if *shutdown.borrow() {
                    break;
                }

                job().await;
            }
        }));
    }

    /// Signal shutdown and abort the task if it is still running a job.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        if let Some(handle) = self.handle.write().await.take() {
            handle.abort();
            info!(task = self.name, "CronTask: {} stopped", self.name);
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .read()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

/// Runs daily learning then the promotion check, by default at 02:00 local.
pub struct DailyLearningScheduler {
    task: CronTask,
    learner: Arc<AutoLearner>,
}

impl DailyLearningScheduler {
    pub fn new(learner: Arc<AutoLearner>, cron_expr: &str) -> Result<Self, QuantError> {
        Ok(Self {
            task: CronTask::new("daily-learning", cron_expr)?,
            learner,
        })
    }

    pub fn task(&self) -> &CronTask {
        &self.task
    }

    pub async fn start(&self) {
        let learner = self.learner.clone();
        self.task
            .start(move || {
                let learner = learner.clone();
                async move {
                    if let Err(e) = learner.run_daily_learning().await {
                        error!(error = %e, "DailyLearningScheduler: learning run failed");
                    }
                    if let Err(e) = learner.check_validating().await {
                        error!(error = %e, "DailyLearningScheduler: promotion check failed");
                    }
                }
            })
            .await;
    }

    pub async fn stop(&self) {
        self.task.stop().await;
    }
}

/// Regenerates and persists the current signal set, once on start and then
/// on every tick. Failures are logged and retried on the next tick.
pub struct SignalRefreshScheduler {
    task: CronTask,
    repository: Arc<dyn Repository>,
    metrics: Option<Arc<Metrics>>,
}

impl SignalRefreshScheduler {
    pub fn new(
        repository: Arc<dyn Repository>,
        metrics: Option<Arc<Metrics>>,
        cron_expr: &str,
    ) -> Result<Self, QuantError> {
        Ok(Self {
            task: CronTask::new("signal-refresh", cron_expr)?.run_on_start(true),
            repository,
            metrics,
        })
    }

    pub fn task(&self) -> &CronTask {
        &self.task
    }

    pub async fn start(&self) {
        let repository = self.repository.clone();
        let metrics = self.metrics.clone();
        self.task
            .start(move || {
                let repository = repository.clone();
                let metrics = metrics.clone();
                async move {
                    let refreshed = async {
                        let runner = StrategyRunner::for_active_version(repository)
                            .await?
                            .with_metrics(metrics);
                        runner.update_signals().await
                    };
                    if let Err(e) = refreshed.await {
                        error!(error = %e, "SignalRefreshScheduler: refresh failed, retrying next tick");
                    }
                }
            })
            .await;
    }

    pub async fn stop(&self) {
        self.task.stop().await;
    }
}
