//! In-process repository for tests, dry runs and backtests over fixtures.

use crate::db::repository::{synthesized_good_name, Repository};
use crate::error::RepositoryError;
use crate::models::{
    BlacklistEntry, LearningLog, PriceSnapshot, StrategyStatus, StrategyVersion, TradeSignal,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    snapshots: BTreeMap<i64, Vec<PriceSnapshot>>,
    names: HashMap<i64, String>,
    signals: Vec<TradeSignal>,
    holdings: HashMap<i64, u32>,
    blacklist: BTreeMap<i64, BlacklistEntry>,
    versions: Vec<StrategyVersion>,
    logs: Vec<LearningLog>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
    unavailable: AtomicBool,
    fail_version_writes: AtomicBool,
    fail_version_reads: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append snapshots, keeping each good's series ordered by time.
    pub async fn insert_snapshots(&self, snapshots: impl IntoIterator<Item = PriceSnapshot>) {
        let mut state = self.state.write().await;
        for snapshot in snapshots {
            state.snapshots.entry(snapshot.good_id).or_default().push(snapshot);
        }
        for series in state.snapshots.values_mut() {
            series.sort_by_key(|s| s.timestamp);
        }
    }

    pub async fn set_good_name(&self, good_id: i64, name: impl Into<String>) {
        self.state.write().await.names.insert(good_id, name.into());
    }

    pub async fn set_holding(&self, good_id: i64, count: u32) {
        self.state.write().await.holdings.insert(good_id, count);
    }

    /// Register a version directly, bypassing the failure switch.
    pub async fn insert_strategy_version(&self, mut version: StrategyVersion) -> i64 {
        let mut state = self.state.write().await;
        let id = state.versions.len() as i64 + 1;
        version.id = Some(id);
        state.versions.push(version);
        id
    }

    /// Every call fails with [`RepositoryError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// `save_strategy_version` fails while set; everything else still works.
    pub fn fail_version_writes(&self, fail: bool) {
        self.fail_version_writes.store(fail, Ordering::SeqCst);
    }

    /// `get_active_strategy_version` fails while set.
    pub fn fail_version_reads(&self, fail: bool) {
        self.fail_version_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn signals(&self) -> Vec<TradeSignal> {
        self.state.read().await.signals.clone()
    }

    pub async fn learning_logs(&self) -> Vec<LearningLog> {
        self.state.read().await.logs.clone()
    }

    pub async fn strategy_versions(&self) -> Vec<StrategyVersion> {
        self.state.read().await.versions.clone()
    }

    pub async fn blacklist(&self) -> Vec<BlacklistEntry> {
        self.state.read().await.blacklist.values().cloned().collect()
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("in-memory repository switched off".to_string()));
        }
        Ok(())
    }
}

fn qualifies(snapshot: &PriceSnapshot, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    snapshot.timestamp >= start
        && snapshot.timestamp <= end
        && snapshot.sell_price.is_finite()
        && snapshot.buy_price.is_finite()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn load_historical_data(
        &self,
        good_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceSnapshot>, RepositoryError> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .snapshots
            .get(&good_id)
            .map(|series| series.iter().filter(|s| qualifies(s, start, end)).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_all_goods_with_sufficient_data(
        &self,
        min_count: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>, RepositoryError> {
        self.ensure_available()?;
        let state = self.state.read().await;
        let mut counted: Vec<(i64, usize)> = state
            .snapshots
            .iter()
            .map(|(id, series)| (*id, series.iter().filter(|s| qualifies(s, start, end)).count()))
            .filter(|(_, count)| *count >= min_count)
            .collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(counted.into_iter().map(|(id, _)| id).collect())
    }

    async fn get_good_name(&self, good_id: i64) -> Result<String, RepositoryError> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .names
            .get(&good_id)
            .cloned()
            .unwrap_or_else(|| synthesized_good_name(good_id)))
    }

    async fn save_trade_signals(&self, signals: &[TradeSignal]) -> Result<usize, RepositoryError> {
        self.ensure_available()?;
        let now = Utc::now();
        let mut state = self.state.write().await;
        state.signals.retain(|s| !s.is_expired(now));
        state.signals.extend_from_slice(signals);
        Ok(signals.len())
    }

    async fn get_current_holding_count(&self, good_id: i64) -> Result<u32, RepositoryError> {
        self.ensure_available()?;
        Ok(self.state.read().await.holdings.get(&good_id).copied().unwrap_or(0))
    }

    async fn is_blacklisted(&self, good_id: i64) -> Result<bool, RepositoryError> {
        self.ensure_available()?;
        Ok(self.state.read().await.blacklist.contains_key(&good_id))
    }

    async fn add_to_blacklist(&self, good_id: i64, reason: &str) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        let now = Utc::now();
        let mut state = self.state.write().await;
        state
            .blacklist
            .entry(good_id)
            .and_modify(|entry| {
                entry.loss_count += 1;
                entry.last_loss_time = now;
                entry.reason = reason.to_string();
            })
            .or_insert_with(|| BlacklistEntry {
                good_id,
                reason: reason.to_string(),
                loss_count: 1,
                last_loss_time: now,
            });
        Ok(())
    }

    async fn get_blacklist_entry(&self, good_id: i64) -> Result<Option<BlacklistEntry>, RepositoryError> {
        self.ensure_available()?;
        Ok(self.state.read().await.blacklist.get(&good_id).cloned())
    }

    async fn get_active_strategy_version(&self) -> Result<Option<StrategyVersion>, RepositoryError> {
        self.ensure_available()?;
        if self.fail_version_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("strategy version reads disabled".to_string()));
        }
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .filter(|v| v.status == StrategyStatus::Active)
            .max_by_key(|v| v.activated_at)
            .cloned())
    }

    async fn save_strategy_version(&self, version: &StrategyVersion) -> Result<i64, RepositoryError> {
        self.ensure_available()?;
        if self.fail_version_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("strategy version writes disabled".to_string()));
        }
        let mut state = self.state.write().await;
        if state.versions.iter().any(|v| v.version == version.version) {
            return Err(RepositoryError::Corrupt(format!(
                "duplicate strategy version '{}'",
                version.version
            )));
        }
        let id = state.versions.len() as i64 + 1;
        let mut stored = version.clone();
        stored.id = Some(id);
        state.versions.push(stored);
        Ok(id)
    }

    async fn list_strategy_versions(
        &self,
        status: StrategyStatus,
    ) -> Result<Vec<StrategyVersion>, RepositoryError> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state.versions.iter().filter(|v| v.status == status).cloned().collect())
    }

    async fn update_strategy_status(
        &self,
        version: &str,
        status: StrategyStatus,
    ) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let stored = state
            .versions
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or_else(|| RepositoryError::Corrupt(format!("no strategy version '{}'", version)))?;
        stored.status = status;
        if status == StrategyStatus::Active {
            stored.activated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn append_learning_log(&self, log: &LearningLog) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        self.state.write().await.logs.push(log.clone());
        Ok(())
    }
}
