//! Persistence contract consumed by every engine component.

use crate::error::RepositoryError;
use crate::models::{
    BlacklistEntry, LearningLog, PriceSnapshot, StrategyStatus, StrategyVersion, TradeSignal,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Name reported for goods without a catalogue entry.
pub fn synthesized_good_name(good_id: i64) -> String {
    format!("Good_{}", good_id)
}

/// The only shared mutable resource. Implementations are treated as
/// transactionally opaque: no locks are held across calls.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Snapshots in `[start, end]` ascending by time, rows with a missing
    /// sell or buy price excluded.
    async fn load_historical_data(
        &self,
        good_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceSnapshot>, RepositoryError>;

    /// Goods with at least `min_count` qualifying snapshots in `[start, end]`,
    /// most samples first.
    async fn get_all_goods_with_sufficient_data(
        &self,
        min_count: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>, RepositoryError>;

    /// Display name, or [`synthesized_good_name`] when unknown.
    async fn get_good_name(&self, good_id: i64) -> Result<String, RepositoryError>;

    /// Delete expired signals, then insert `signals`. Returns rows inserted.
    async fn save_trade_signals(&self, signals: &[TradeSignal]) -> Result<usize, RepositoryError>;

    async fn get_current_holding_count(&self, good_id: i64) -> Result<u32, RepositoryError>;

    async fn is_blacklisted(&self, good_id: i64) -> Result<bool, RepositoryError>;

    /// Upsert: inserts with a loss count of 1 or increments the existing count.
    async fn add_to_blacklist(&self, good_id: i64, reason: &str) -> Result<(), RepositoryError>;

    async fn get_blacklist_entry(&self, good_id: i64) -> Result<Option<BlacklistEntry>, RepositoryError>;

    /// Most recently activated version, if any.
    async fn get_active_strategy_version(&self) -> Result<Option<StrategyVersion>, RepositoryError>;

    async fn save_strategy_version(&self, version: &StrategyVersion) -> Result<i64, RepositoryError>;

    async fn list_strategy_versions(
        &self,
        status: StrategyStatus,
    ) -> Result<Vec<StrategyVersion>, RepositoryError>;

    async fn update_strategy_status(
        &self,
        version: &str,
        status: StrategyStatus,
    ) -> Result<(), RepositoryError>;

    async fn append_learning_log(&self, log: &LearningLog) -> Result<(), RepositoryError>;
}
