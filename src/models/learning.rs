use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub good_id: i64,
    pub reason: String,
    pub loss_count: u32,
    pub last_loss_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStatus {
    Success,
    Failed,
}

impl LearningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStatus::Success => "success",
            LearningStatus::Failed => "failed",
        }
    }
}

/// Append-only audit row written once per learning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningLog {
    pub learning_time: DateTime<Utc>,
    pub data_range: String,
    pub best_params: Option<serde_json::Value>,
    pub backtest_sharpe_ratio: Option<f64>,
    pub backtest_return_rate: Option<f64>,
    pub backtest_win_rate: Option<f64>,
    pub status: LearningStatus,
    pub error_message: Option<String>,
}

impl LearningLog {
    pub fn failed(learning_time: DateTime<Utc>, data_range: String, error: String) -> Self {
        Self {
            learning_time,
            data_range,
            best_params: None,
            backtest_sharpe_ratio: None,
            backtest_return_rate: None,
            backtest_win_rate: None,
            status: LearningStatus::Failed,
            error_message: Some(error),
        }
    }
}
