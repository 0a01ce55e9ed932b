use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Hours a persisted signal stays actionable.
pub const SIGNAL_TTL_HOURS: i64 = 1;

/// A candidate buy decision for one good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub good_id: i64,
    pub good_name: String,
    pub current_buy_price: f64,
    pub current_sell_price: f64,
    pub predicted_price_7d: f64,
    /// Percent, net of fee.
    pub predicted_profit_rate: f64,
    pub confidence_score: f64,
    /// 0..=100.
    pub signal_strength: f64,
    pub trend_score: f64,
    pub spread_score: f64,
    pub liquidity_score: f64,
    /// Coefficient of variation, percent.
    pub volatility: f64,
    pub recommended_quantity: u32,
    pub max_investment: f64,
    pub reason: String,
    pub strategy_version: String,
    pub signal_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TradeSignal {
    /// Re-stamp with the producing strategy version and a fresh TTL window.
    pub fn stamped(mut self, good_name: String, strategy_version: &str, now: DateTime<Utc>) -> Self {
        self.good_name = good_name;
        self.strategy_version = strategy_version.to_string();
        self.signal_time = now;
        self.expires_at = now + Duration::hours(SIGNAL_TTL_HOURS);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Copy with quantity (and the investment it implies) reduced to `quantity`.
    /// Never raises either value.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        let mut adjusted = self.clone();
        if quantity < self.recommended_quantity {
            adjusted.recommended_quantity = quantity;
            adjusted.max_investment =
                (self.current_buy_price * quantity as f64).min(self.max_investment);
        }
        adjusted
    }
}
