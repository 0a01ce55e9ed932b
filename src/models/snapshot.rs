use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One market sample for a good. Buy price may exceed sell price; nothing
/// here enforces ordering between the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub good_id: i64,
    pub sell_price: f64,
    pub buy_price: f64,
    pub sell_count: u32,
    pub buy_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn new(good_id: i64, sell_price: f64, buy_price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            good_id,
            sell_price,
            buy_price,
            sell_count: 0,
            buy_count: 0,
            timestamp,
        }
    }

    pub fn with_counts(mut self, sell_count: u32, buy_count: u32) -> Self {
        self.sell_count = sell_count;
        self.buy_count = buy_count;
        self
    }

    /// Sell minus buy, or 0 when no buy order exists.
    pub fn spread(&self) -> f64 {
        if self.buy_price > 0.0 {
            self.sell_price - self.buy_price
        } else {
            0.0
        }
    }
}
