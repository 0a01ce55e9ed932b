use crate::models::{BacktestResult, StrategyConfig};

/// Ranks backtested candidates. Only eligible candidates compete on score.
pub trait Objective: Send + Sync {
    fn score(&self, result: &BacktestResult) -> f64;

    fn is_eligible(&self, result: &BacktestResult, config: &StrategyConfig) -> bool;
}

/// `sharpe * 100 + return rate - 2 * drawdown`, among profitable candidates
/// inside their drawdown budget that win at least 60% of trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObjective;

pub const MIN_ELIGIBLE_WIN_RATE: f64 = 60.0;

impl Objective for DefaultObjective {
    fn score(&self, result: &BacktestResult) -> f64 {
        result.sharpe_ratio * 100.0 + result.total_return_rate - result.max_drawdown * 2.0
    }

    fn is_eligible(&self, result: &BacktestResult, config: &StrategyConfig) -> bool {
        result.total_return_rate > 0.0
            && result.max_drawdown <= config.max_drawdown
            && result.win_rate >= MIN_ELIGIBLE_WIN_RATE
    }
}
