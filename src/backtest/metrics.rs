//! Aggregate statistics over simulated trades.

use crate::common::math;
use crate::models::{BacktestResult, BacktestTrade};

/// Notional starting capital behind the return-rate and drawdown figures.
pub const INITIAL_CAPITAL: f64 = 1000.0;

/// Mean over population std-dev of per-trade percent returns; 0 when flat.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    match (math::mean(returns), math::std_dev(returns)) {
        (Some(mean), Some(std)) if std > 0.0 => mean / std,
        _ => 0.0,
    }
}

/// Largest percent decline from the running capital peak, trades applied in order.
pub fn max_drawdown(trades: &[BacktestTrade]) -> f64 {
    let mut capital = INITIAL_CAPITAL;
    let mut peak = capital;
    let mut worst = 0.0_f64;

    for trade in trades {
        capital += trade.net_profit;
        peak = peak.max(capital);
        worst = worst.max((peak - capital) / peak * 100.0);
    }
    worst
}

/// Fold trades, in the order given, into a [`BacktestResult`].
pub fn summarize(trades: Vec<BacktestTrade>) -> BacktestResult {
    let mut result = BacktestResult::default();

    for trade in &trades {
        result.total_trades += 1;
        if trade.profit_rate > 0.0 {
            result.winning_trades += 1;
        } else {
            result.losing_trades += 1;
        }
        result.total_return += trade.net_profit;
        *result.profits_by_good.entry(trade.good_id).or_insert(0.0) += trade.net_profit;
    }

    if result.total_trades > 0 {
        let n = result.total_trades as f64;
        let returns: Vec<f64> = trades.iter().map(|t| t.profit_rate).collect();

        result.win_rate = result.winning_trades as f64 / n * 100.0;
        result.total_return_rate = result.total_return / INITIAL_CAPITAL * 100.0;
        result.sharpe_ratio = sharpe_ratio(&returns);
        result.max_drawdown = max_drawdown(&trades);
        result.avg_holding_days = trades.iter().map(|t| f64::from(t.holding_days)).sum::<f64>() / n;
    }

    result.trades = trades;
    result
}
