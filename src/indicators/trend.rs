//! Moving averages, EMA, percent change and OLS trend over sell prices

use crate::common::math;

pub const SHORT_WINDOW: usize = 24;
pub const MEDIUM_WINDOW: usize = 72;
pub const LONG_WINDOW: usize = 168;

#[derive(Debug, Clone, PartialEq)]
pub struct TrendStats {
    pub ma_24h: Option<f64>,
    pub ma_72h: Option<f64>,
    pub ma_168h: Option<f64>,
    pub ema_24h: Option<f64>,
    pub price_change_1d: f64,
    pub price_change_7d: f64,
    /// Absolute price change per sample.
    pub slope: f64,
    /// R² of the fit, in [0, 1].
    pub strength: f64,
}

impl TrendStats {
    pub fn compute(prices: &[f64]) -> Self {
        let n = prices.len();
        let latest = prices.last().copied().unwrap_or_default();

        let price_change_1d = if n > SHORT_WINDOW {
            math::pct_change(prices[n - SHORT_WINDOW], latest)
        } else {
            0.0
        };
        let price_change_7d = if n > LONG_WINDOW {
            math::pct_change(prices[n - LONG_WINDOW], latest)
        } else {
            0.0
        };

        let (slope, strength) = math::linear_trend(prices);

        Self {
            ma_24h: math::sma(prices, SHORT_WINDOW),
            ma_72h: math::sma(prices, MEDIUM_WINDOW),
            ma_168h: math::sma(prices, LONG_WINDOW),
            ema_24h: if n >= SHORT_WINDOW {
                math::ema(prices, SHORT_WINDOW)
            } else {
                None
            },
            price_change_1d,
            price_change_7d,
            slope,
            strength,
        }
    }
}
