//! Postgres-backed repository

use crate::db::repository::{synthesized_good_name, Repository};
use crate::error::RepositoryError;
use crate::models::{
    BlacklistEntry, LearningLog, PriceSnapshot, StrategyStatus, StrategyVersion, TradeSignal,
};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, info, warn};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS goods (
        good_id BIGINT PRIMARY KEY,
        market_hash_name TEXT,
        name TEXT
    )",
    "CREATE TABLE IF NOT EXISTS good_snapshots (
        good_id BIGINT NOT NULL,
        sell_price DOUBLE PRECISION,
        buy_price DOUBLE PRECISION,
        sell_count INT,
        buy_count INT,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_good_snapshots_good_time ON good_snapshots (good_id, created_at)",
    "CREATE TABLE IF NOT EXISTS trading_signals (
        id BIGSERIAL PRIMARY KEY,
        good_id BIGINT NOT NULL,
        good_name TEXT,
        current_buy_price DOUBLE PRECISION NOT NULL,
        current_sell_price DOUBLE PRECISION NOT NULL,
        predicted_price_7d DOUBLE PRECISION NOT NULL,
        predicted_profit_rate DOUBLE PRECISION NOT NULL,
        confidence_score DOUBLE PRECISION NOT NULL,
        signal_strength DOUBLE PRECISION NOT NULL,
        trend_score DOUBLE PRECISION,
        spread_score DOUBLE PRECISION,
        liquidity_score DOUBLE PRECISION,
        volatility DOUBLE PRECISION,
        recommended_quantity INT,
        max_investment DOUBLE PRECISION,
        reason TEXT,
        strategy_version TEXT,
        signal_time TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS trade_records (
        id BIGSERIAL PRIMARY KEY,
        good_id BIGINT NOT NULL,
        good_name TEXT,
        buy_price DOUBLE PRECISION NOT NULL,
        buy_time TIMESTAMPTZ NOT NULL,
        sell_price DOUBLE PRECISION,
        sell_time TIMESTAMPTZ,
        actual_profit_rate DOUBLE PRECISION,
        predicted_profit_rate DOUBLE PRECISION,
        strategy_version TEXT,
        status TEXT NOT NULL DEFAULT 'holding',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS good_blacklist (
        good_id BIGINT PRIMARY KEY,
        reason TEXT,
        loss_count INT NOT NULL DEFAULT 0,
        last_loss_time TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS strategy_versions (
        id BIGSERIAL PRIMARY KEY,
        version TEXT UNIQUE NOT NULL,
        config JSONB NOT NULL,
        status TEXT NOT NULL DEFAULT 'training',
        backtest_metrics JSONB,
        validation_start_time TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        activated_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS learning_logs (
        id BIGSERIAL PRIMARY KEY,
        learning_time TIMESTAMPTZ NOT NULL,
        data_range TEXT,
        best_params JSONB,
        backtest_sharpe_ratio DOUBLE PRECISION,
        backtest_return_rate DOUBLE PRECISION,
        backtest_win_rate DOUBLE PRECISION,
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
];

const VERSION_COLUMNS: &str =
    "id, version, config, status, backtest_metrics, validation_start_time, created_at, activated_at";

pub struct PostgresRepository {
    client: Arc<RwLock<Option<Client>>>,
}

impl PostgresRepository {
    /// Connect once and bootstrap the schema.
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Postgres connection error");
            }
        });

        let repo = Self {
            client: Arc::new(RwLock::new(Some(client))),
        };
        repo.init_schema().await?;
        info!("Postgres repository ready");
        Ok(repo)
    }

    /// [`connect`](Self::connect) with exponential backoff.
    pub async fn connect_with_retry(url: &str, max_attempts: usize) -> Result<Self, RepositoryError> {
        (|| Self::connect(url))
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_times(max_attempts),
            )
            .notify(|err: &RepositoryError, dur: Duration| {
                warn!(error = %err, retry_in = ?dur, "Postgres connect failed, retrying");
            })
            .await
    }

    /// Drop the client; later calls report [`RepositoryError::Unavailable`].
    pub async fn close(&self) {
        self.client.write().await.take();
    }

    async fn init_schema(&self) -> Result<(), RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        for statement in SCHEMA {
            client.batch_execute(statement).await?;
        }
        Ok(())
    }
}

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("postgres client closed".to_string())
}

fn count_to_u32(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

fn snapshot_from_row(row: &Row) -> PriceSnapshot {
    let sell_count: Option<i32> = row.get(3);
    let buy_count: Option<i32> = row.get(4);
    PriceSnapshot {
        good_id: row.get(0),
        sell_price: row.get(1),
        buy_price: row.get(2),
        sell_count: sell_count.unwrap_or(0).max(0) as u32,
        buy_count: buy_count.unwrap_or(0).max(0) as u32,
        timestamp: row.get(5),
    }
}

fn version_from_row(row: &Row) -> Result<StrategyVersion, RepositoryError> {
    let status_raw: String = row.get(3);
    let status = StrategyStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Corrupt(format!("unknown strategy status '{}'", status_raw)))?;
    let metrics: Option<serde_json::Value> = row.get(4);

    Ok(StrategyVersion {
        id: Some(row.get(0)),
        version: row.get(1),
        config: serde_json::from_value(row.get(2))?,
        status,
        backtest_metrics: metrics.map(serde_json::from_value).transpose()?,
        validation_start_time: row.get(5),
        created_at: row.get(6),
        activated_at: row.get(7),
    })
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn load_historical_data(
        &self,
        good_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceSnapshot>, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let rows = client
            .query(
                "SELECT good_id, sell_price, buy_price, sell_count, buy_count, created_at
                 FROM good_snapshots
                 WHERE good_id = $1
                   AND created_at BETWEEN $2 AND $3
                   AND sell_price IS NOT NULL
                   AND buy_price IS NOT NULL
                 ORDER BY created_at ASC",
                &[&good_id, &start, &end],
            )
            .await?;

        Ok(rows.iter().map(snapshot_from_row).collect())
    }

    async fn get_all_goods_with_sufficient_data(
        &self,
        min_count: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let min_count = i64::try_from(min_count).unwrap_or(i64::MAX);
        let rows = client
            .query(
                "SELECT good_id
                 FROM good_snapshots
                 WHERE created_at BETWEEN $1 AND $2
                   AND sell_price IS NOT NULL
                   AND buy_price IS NOT NULL
                 GROUP BY good_id
                 HAVING COUNT(*) >= $3
                 ORDER BY COUNT(*) DESC, good_id ASC",
                &[&start, &end, &min_count],
            )
            .await?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn get_good_name(&self, good_id: i64) -> Result<String, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let row = client
            .query_opt(
                "SELECT COALESCE(market_hash_name, name) FROM goods WHERE good_id = $1 LIMIT 1",
                &[&good_id],
            )
            .await?;

        let name: Option<String> = row.and_then(|r| r.get(0));
        Ok(name.unwrap_or_else(|| synthesized_good_name(good_id)))
    }

    async fn save_trade_signals(&self, signals: &[TradeSignal]) -> Result<usize, RepositoryError> {
        let mut guard = self.client.write().await;
        let client = guard.as_mut().ok_or_else(unavailable)?;
        let tx = client.transaction().await?;

        let purged = tx
            .execute("DELETE FROM trading_signals WHERE expires_at <= NOW()", &[])
            .await?;
        debug!(purged = purged, "Purged expired trading signals");

        let stmt = tx
            .prepare(
                "INSERT INTO trading_signals (
                    good_id, good_name, current_buy_price, current_sell_price,
                    predicted_price_7d, predicted_profit_rate, confidence_score, signal_strength,
                    trend_score, spread_score, liquidity_score, volatility,
                    recommended_quantity, max_investment, reason, strategy_version,
                    signal_time, expires_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
            )
            .await?;

        for signal in signals {
            let quantity = i32::try_from(signal.recommended_quantity).unwrap_or(i32::MAX);
            tx.execute(
                &stmt,
                &[
                    &signal.good_id,
                    &signal.good_name,
                    &signal.current_buy_price,
                    &signal.current_sell_price,
                    &signal.predicted_price_7d,
                    &signal.predicted_profit_rate,
                    &signal.confidence_score,
                    &signal.signal_strength,
                    &signal.trend_score,
                    &signal.spread_score,
                    &signal.liquidity_score,
                    &signal.volatility,
                    &quantity,
                    &signal.max_investment,
                    &signal.reason,
                    &signal.strategy_version,
                    &signal.signal_time,
                    &signal.expires_at,
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(signals.len())
    }

    async fn get_current_holding_count(&self, good_id: i64) -> Result<u32, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM trade_records WHERE good_id = $1 AND status = 'holding'",
                &[&good_id],
            )
            .await?;
        Ok(count_to_u32(row.get(0)))
    }

    async fn is_blacklisted(&self, good_id: i64) -> Result<bool, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let row = client
            .query_one("SELECT COUNT(*) FROM good_blacklist WHERE good_id = $1", &[&good_id])
            .await?;
        let count: i64 = row.get(0);
        Ok(count > 0)
    }

    async fn add_to_blacklist(&self, good_id: i64, reason: &str) -> Result<(), RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        client
            .execute(
                "INSERT INTO good_blacklist (good_id, reason, loss_count, last_loss_time)
                 VALUES ($1, $2, 1, NOW())
                 ON CONFLICT (good_id) DO UPDATE SET
                    loss_count = good_blacklist.loss_count + 1,
                    last_loss_time = NOW(),
                    reason = EXCLUDED.reason",
                &[&good_id, &reason],
            )
            .await?;
        Ok(())
    }

    async fn get_blacklist_entry(&self, good_id: i64) -> Result<Option<BlacklistEntry>, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let row = client
            .query_opt(
                "SELECT good_id, reason, loss_count, last_loss_time FROM good_blacklist WHERE good_id = $1",
                &[&good_id],
            )
            .await?;

        Ok(row.map(|r| {
            let reason: Option<String> = r.get(1);
            let loss_count: i32 = r.get(2);
            BlacklistEntry {
                good_id: r.get(0),
                reason: reason.unwrap_or_default(),
                loss_count: loss_count.max(0) as u32,
                last_loss_time: r.get(3),
            }
        }))
    }

    async fn get_active_strategy_version(&self) -> Result<Option<StrategyVersion>, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let query = format!(
            "SELECT {} FROM strategy_versions WHERE status = 'active'
             ORDER BY activated_at DESC NULLS LAST LIMIT 1",
            VERSION_COLUMNS
        );
        let row = client.query_opt(&query, &[]).await?;
        row.as_ref().map(version_from_row).transpose()
    }

    async fn save_strategy_version(&self, version: &StrategyVersion) -> Result<i64, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let config = serde_json::to_value(&version.config)?;
        let metrics = version
            .backtest_metrics
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let row = client
            .query_one(
                "INSERT INTO strategy_versions
                    (version, config, status, backtest_metrics, validation_start_time, created_at, activated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING id",
                &[
                    &version.version,
                    &config,
                    &version.status.as_str(),
                    &metrics,
                    &version.validation_start_time,
                    &version.created_at,
                    &version.activated_at,
                ],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn list_strategy_versions(
        &self,
        status: StrategyStatus,
    ) -> Result<Vec<StrategyVersion>, RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let query = format!(
            "SELECT {} FROM strategy_versions WHERE status = $1 ORDER BY created_at ASC",
            VERSION_COLUMNS
        );
        let rows = client.query(&query, &[&status.as_str()]).await?;
        rows.iter().map(version_from_row).collect()
    }

    async fn update_strategy_status(
        &self,
        version: &str,
        status: StrategyStatus,
    ) -> Result<(), RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        let updated = client
            .execute(
                "UPDATE strategy_versions
                 SET status = $2,
                     activated_at = CASE WHEN $2 = 'active' THEN NOW() ELSE activated_at END
                 WHERE version = $1",
                &[&version, &status.as_str()],
            )
            .await?;
        if updated == 0 {
            return Err(RepositoryError::Corrupt(format!("no strategy version '{}'", version)));
        }
        Ok(())
    }

    async fn append_learning_log(&self, log: &LearningLog) -> Result<(), RepositoryError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(unavailable)?;
        client
            .execute(
                "INSERT INTO learning_logs (
                    learning_time, data_range, best_params,
                    backtest_sharpe_ratio, backtest_return_rate, backtest_win_rate,
                    status, error_message
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &log.learning_time,
                    &log.data_range,
                    &log.best_params,
                    &log.backtest_sharpe_ratio,
                    &log.backtest_return_rate,
                    &log.backtest_win_rate,
                    &log.status.as_str(),
                    &log.error_message,
                ],
            )
            .await?;
        Ok(())
    }
}
