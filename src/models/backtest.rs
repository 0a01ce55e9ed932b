use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One simulated round trip: buy at the signal, forced sell after the cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub good_id: i64,
    pub good_name: String,
    pub buy_time: DateTime<Utc>,
    pub buy_price: f64,
    pub sell_time: DateTime<Utc>,
    pub sell_price: f64,
    /// Percent, fee deducted.
    pub profit_rate: f64,
    pub net_profit: f64,
    pub holding_days: u32,
    pub signal_strength: f64,
}

/// Aggregate output of one backtest run. Rates are percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_return: f64,
    pub total_return_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub avg_holding_days: f64,
    pub trades: Vec<BacktestTrade>,
    pub profits_by_good: BTreeMap<i64, f64>,
}

/// The scalar part of a [`BacktestResult`], persisted with strategy versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_return: f64,
    pub total_return_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub avg_holding_days: f64,
}

impl BacktestResult {
    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary {
            total_trades: self.total_trades,
            winning_trades: self.winning_trades,
            losing_trades: self.losing_trades,
            win_rate: self.win_rate,
            total_return: self.total_return,
            total_return_rate: self.total_return_rate,
            sharpe_ratio: self.sharpe_ratio,
            max_drawdown: self.max_drawdown,
            avg_holding_days: self.avg_holding_days,
        }
    }

    /// Goods whose summed net profit is negative, ascending by id.
    pub fn losing_goods(&self) -> Vec<(i64, f64)> {
        self.profits_by_good
            .iter()
            .filter(|(_, profit)| **profit < 0.0)
            .map(|(id, profit)| (*id, *profit))
            .collect()
    }
}
