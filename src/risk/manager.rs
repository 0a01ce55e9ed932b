use crate::db::Repository;
use crate::error::{Rejection, RepositoryError};
use crate::models::{StrategyConfig, TradeSignal};
use std::sync::Arc;
use tracing::{debug, info};

/// Bounds on `predicted / current sell` outside which a forecast is treated as corrupt.
pub const MIN_FORECAST_RATIO: f64 = 0.7;
pub const MAX_FORECAST_RATIO: f64 = 1.5;

const BLACKLIST_LOSS_COUNT: u32 = 3;
const BLACKLIST_TOTAL_LOSS: f64 = -100.0;

/// Outcome of a position check. The approved signal is a new value whose
/// quantity and investment never exceed the input's.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionDecision {
    Approved(TradeSignal),
    Rejected(Rejection),
}

impl PositionDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, PositionDecision::Approved(_))
    }

    /// Quantity that would actually be bought: zero when rejected.
    pub fn quantity(&self) -> u32 {
        match self {
            PositionDecision::Approved(signal) => signal.recommended_quantity,
            PositionDecision::Rejected(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskReport {
    pub total_positions: u32,
    pub total_value: f64,
    pub diversification_ok: bool,
    /// Held goods that have since been blacklisted.
    pub high_risk_goods: Vec<i64>,
    pub warnings: Vec<String>,
}

pub struct RiskManager {
    repository: Arc<dyn Repository>,
    config: StrategyConfig,
}

impl RiskManager {
    pub fn new(repository: Arc<dyn Repository>, config: StrategyConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Reject internally inconsistent signals.
    pub fn validate_signal(&self, signal: &TradeSignal) -> Result<(), Rejection> {
        if !(signal.current_buy_price > 0.0) || !(signal.current_sell_price > 0.0) {
            return Err(Rejection::SanityViolation(format!(
                "non-positive price (buy {:.2}, sell {:.2})",
                signal.current_buy_price, signal.current_sell_price
            )));
        }
        if signal.current_buy_price > signal.current_sell_price {
            return Err(Rejection::SanityViolation(format!(
                "crossed prices: buy {:.2} above sell {:.2}",
                signal.current_buy_price, signal.current_sell_price
            )));
        }
        if !(signal.predicted_price_7d > 0.0) {
            return Err(Rejection::SanityViolation(format!(
                "non-positive forecast {:.2}",
                signal.predicted_price_7d
            )));
        }

        let ratio = signal.predicted_price_7d / signal.current_sell_price;
        if !(MIN_FORECAST_RATIO..=MAX_FORECAST_RATIO).contains(&ratio) {
            return Err(Rejection::SanityViolation(format!(
                "forecast swing too large ({:.2} -> {:.2})",
                signal.current_sell_price, signal.predicted_price_7d
            )));
        }
        if !(0.0..=1.0).contains(&signal.confidence_score) {
            return Err(Rejection::SanityViolation(format!(
                "confidence {:.3} outside [0, 1]",
                signal.confidence_score
            )));
        }
        if !(signal.volatility <= self.config.max_volatility) {
            return Err(Rejection::SanityViolation(format!(
                "volatility {:.2} above cap {:.2}",
                signal.volatility, self.config.max_volatility
            )));
        }
        Ok(())
    }

    /// Apply blacklist, holding cap, top-up and position-size rules.
    ///
    /// Repository failures propagate; every business rule outcome is a
    /// [`PositionDecision`].
    pub async fn check_position_limit(
        &self,
        signal: &TradeSignal,
    ) -> Result<PositionDecision, RepositoryError> {
        let good_id = signal.good_id;
        if self.repository.is_blacklisted(good_id).await? {
            return Ok(PositionDecision::Rejected(Rejection::PositionConstraint(format!(
                "good {} is blacklisted",
                good_id
            ))));
        }

        let holding = self.repository.get_current_holding_count(good_id).await?;
        let max_items = self.config.max_items_per_good;
        if holding >= max_items {
            return Ok(PositionDecision::Rejected(Rejection::PositionConstraint(format!(
                "holding cap reached ({}/{})",
                holding, max_items
            ))));
        }

        let mut adjusted = signal.with_quantity(max_items - holding);
        if adjusted.recommended_quantity < signal.recommended_quantity {
            debug!(
                good_id = good_id,
                requested = signal.recommended_quantity,
                allowed = adjusted.recommended_quantity,
                holding = holding,
                "Quantity capped by remaining room"
            );
        }

        if holding > 0
            && (adjusted.confidence_score < self.config.high_confidence_threshold
                || adjusted.predicted_profit_rate < self.config.high_confidence_min_profit)
        {
            return Ok(PositionDecision::Rejected(Rejection::PositionConstraint(format!(
                "already holding {} without high conviction (confidence {:.2}, profit {:.2}%)",
                holding, adjusted.confidence_score, adjusted.predicted_profit_rate
            ))));
        }

        if adjusted.max_investment > self.config.max_position_size {
            let affordable = (self.config.max_position_size / adjusted.current_buy_price).floor();
            if affordable < 1.0 {
                return Ok(PositionDecision::Rejected(Rejection::PositionConstraint(format!(
                    "unit price {:.2} exceeds max position size {:.2}",
                    adjusted.current_buy_price, self.config.max_position_size
                ))));
            }
            let affordable = affordable.min(u32::MAX as f64) as u32;
            adjusted = adjusted.with_quantity(affordable);
            // Rounding can leave the investment a hair over the cap.
            adjusted.max_investment = adjusted.max_investment.min(self.config.max_position_size);
        }

        Ok(PositionDecision::Approved(adjusted))
    }

    /// Independent 1/2/3-unit sizing heuristic, capped at the per-good limit.
    pub fn calculate_position_size(&self, signal: &TradeSignal) -> u32 {
        let config = &self.config;
        let mut quantity = config.default_quantity;

        if signal.confidence_score >= config.high_confidence_threshold
            && signal.predicted_profit_rate >= config.high_confidence_min_profit
        {
            if signal.confidence_score >= 0.98 && signal.predicted_profit_rate >= 8.0 {
                quantity = config.max_multiple_quantity;
            } else if signal.confidence_score >= 0.95 && signal.predicted_profit_rate >= 5.0 {
                quantity = 2;
            }
        }

        quantity.min(config.max_items_per_good)
    }

    pub fn should_update_blacklist(&self, good_id: i64, loss_count: u32, total_loss: f64) -> bool {
        let flagged = loss_count >= BLACKLIST_LOSS_COUNT || total_loss < BLACKLIST_TOTAL_LOSS;
        if flagged {
            debug!(good_id = good_id, loss_count = loss_count, total_loss = total_loss, "Blacklist threshold crossed");
        }
        flagged
    }

    /// Summarise exposure across `positions`, given as `(good_id, current price)`.
    pub async fn monitor_risk(&self, positions: &[(i64, f64)]) -> Result<RiskReport, RepositoryError> {
        let mut report = RiskReport::default();
        let mut largest = 0u32;

        for &(good_id, price) in positions {
            let held = self.repository.get_current_holding_count(good_id).await?;
            if held == 0 {
                continue;
            }
            report.total_positions += held;
            report.total_value += held as f64 * price;
            largest = largest.max(held);

            if self.repository.is_blacklisted(good_id).await? {
                report.high_risk_goods.push(good_id);
                report
                    .warnings
                    .push(format!("good {} is held ({}) but blacklisted", good_id, held));
            }
            if held >= self.config.max_items_per_good {
                report
                    .warnings
                    .push(format!("good {} at holding cap ({})", good_id, held));
            }
        }

        // Concentrated when one good carries more than half of all positions.
        report.diversification_ok =
            report.total_positions <= 1 || largest * 2 <= report.total_positions;
        if !report.diversification_ok {
            report.warnings.push(format!(
                "portfolio concentrated: {} of {} positions in one good",
                largest, report.total_positions
            ));
        }

        info!(
            positions = report.total_positions,
            value = report.total_value,
            warnings = report.warnings.len(),
            "Risk report"
        );
        Ok(report)
    }
}
