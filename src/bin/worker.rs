//! csquant worker
//!
//! Refreshes trade signals and runs the daily learning pipeline against the
//! Postgres repository. `WORKER_MODE` selects a long-running daemon or a
//! single train / backtest / signals pass.

use chrono::{Duration, Utc};
use csquant::config::{WorkerConfig, WorkerMode};
use csquant::core::{QuantRuntime, RuntimeConfig};
use csquant::db::{PostgresRepository, Repository};
use csquant::learning::LEARNING_WINDOW_DAYS;
use csquant::logging;
use csquant::metrics::Metrics;
use csquant::models::StrategyVersion;
use csquant::strategies::StrategyRunner;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};

const CONNECT_ATTEMPTS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let env = csquant::config::get_environment();
    let worker_config = WorkerConfig::from_env()?;
    info!("Starting csquant worker");
    info!(environment = %env, mode = ?worker_config.mode, "Environment");

    let metrics = Arc::new(Metrics::new()?);

    info!("Connecting to Postgres...");
    let repository: Arc<dyn Repository> =
        match PostgresRepository::connect_with_retry(&worker_config.database_url, CONNECT_ATTEMPTS).await {
            Ok(repo) => {
                info!("Postgres connected");
                metrics.database_connected.set(1.0);
                Arc::new(repo)
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to Postgres");
                return Err(format!("Postgres connection required for worker: {}", e).into());
            }
        };

    let runtime = QuantRuntime::new(
        RuntimeConfig::from(&worker_config),
        repository.clone(),
        Some(metrics.clone()),
    )?;

    match worker_config.mode {
        WorkerMode::Daemon => {
            runtime.start().await;
            info!("Worker started, waiting for shutdown signal...");
            signal::ctrl_c().await?;
            info!("Shutting down worker...");
            runtime.stop().await;
            info!("Worker stopped");
        }
        WorkerMode::Train => {
            let learner = runtime.learner();
            let version = learner.run_daily_learning().await?;
            info!(version = %version.version, "Learning run finished");
            learner.check_validating().await?;
        }
        WorkerMode::Backtest => {
            let active = repository
                .get_active_strategy_version()
                .await?
                .unwrap_or_else(|| StrategyVersion::default_active(Utc::now()));
            let end = Utc::now();
            let start = end - Duration::days(LEARNING_WINDOW_DAYS);
            let engine = runtime.backtest_engine(active.config);
            let result = engine.run_backtest(start, end).await?;
            println!("{}", serde_json::to_string_pretty(&result.summary())?);
            match engine.validate_strategy(&result) {
                Ok(()) => info!(version = %active.version, "Backtest passes validation"),
                Err(e) => warn!(version = %active.version, error = %e, "Backtest fails validation"),
            }
        }
        WorkerMode::Signals => {
            let runner = StrategyRunner::for_active_version(repository.clone())
                .await?
                .with_metrics(Some(metrics.clone()));
            let saved = runner.update_signals().await?;
            info!(saved = saved, "Signal refresh finished");
        }
    }

    debug!(metrics = %metrics.render(), "Final metrics");
    Ok(())
}
