//! Process configuration read from the environment.
//!
//! Only the worker binary calls into this module. Engine components are built
//! from a repository handle and a [`crate::models::StrategyConfig`] value.

use std::env;

pub const DEFAULT_SIGNAL_CRON: &str = "0 0 * * * *";
pub const DEFAULT_LEARNING_CRON: &str = "0 0 2 * * *";

/// Deployment environment name (`ENVIRONMENT`, default `sandbox`).
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

/// Postgres connection string (`DATABASE_URL`).
pub fn get_database_url() -> String {
    env::var("DATABASE_URL")
        .unwrap_or_else(|_| "host=localhost user=postgres dbname=csquant".to_string())
}

/// What the worker binary does after bootstrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Run both schedulers until interrupted.
    Daemon,
    /// One learning run, then exit.
    Train,
    /// One backtest over the training window, then exit.
    Backtest,
    /// One signal refresh, then exit.
    Signals,
}

impl WorkerMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daemon" => Some(WorkerMode::Daemon),
            "train" => Some(WorkerMode::Train),
            "backtest" => Some(WorkerMode::Backtest),
            "signals" => Some(WorkerMode::Signals),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub mode: WorkerMode,
    pub database_url: String,
    pub signal_cron: String,
    pub learning_cron: String,
    /// Threads for the backtest/optimizer pool (0 = rayon default).
    pub pool_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            mode: WorkerMode::Daemon,
            database_url: get_database_url(),
            signal_cron: DEFAULT_SIGNAL_CRON.to_string(),
            learning_cron: DEFAULT_LEARNING_CRON.to_string(),
            pool_size: 0,
        }
    }
}

impl WorkerConfig {
    /// Build from `WORKER_MODE`, `DATABASE_URL`, `SIGNAL_CRON`,
    /// `LEARNING_CRON` and `BACKTEST_POOL_SIZE`.
    pub fn from_env() -> Result<Self, String> {
        let mode = match env::var("WORKER_MODE") {
            Ok(raw) => WorkerMode::parse(&raw).ok_or_else(|| format!("unknown WORKER_MODE '{}'", raw))?,
            Err(_) => WorkerMode::Daemon,
        };

        let pool_size = env::var("BACKTEST_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Self {
            mode,
            database_url: get_database_url(),
            signal_cron: env::var("SIGNAL_CRON").unwrap_or_else(|_| DEFAULT_SIGNAL_CRON.to_string()),
            learning_cron: env::var("LEARNING_CRON")
                .unwrap_or_else(|_| DEFAULT_LEARNING_CRON.to_string()),
            pool_size,
        })
    }
}
