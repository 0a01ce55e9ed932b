use crate::error::Rejection;
use crate::indicators::{FeatureExtractor, FeatureSet};
use crate::models::{PriceSnapshot, StrategyConfig, TradeSignal, SIGNAL_TTL_HOURS};
use crate::signals::scoring::{
    calculate_confidence, liquidity_score, signal_strength, spread_score, trend_score,
};
use chrono::Duration;

/// Samples required before a window is scored (seven days of hourly data).
pub const MIN_SIGNAL_POINTS: usize = 168;
/// Forecast horizon, in trend-slope steps.
pub const FORECAST_STEPS: f64 = 7.0;
/// Confidence above which the full multiple quantity is recommended.
pub const TOP_CONFIDENCE: f64 = 0.98;
const ELEVATED_QUANTITY: u32 = 2;

/// Scores a window into a buy signal. Pure; safe to run per good in parallel.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: StrategyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScores {
    pub trend: f64,
    pub spread: f64,
    pub liquidity: f64,
}

impl ComponentScores {
    pub fn from_features(features: &FeatureSet) -> Self {
        Self {
            trend: trend_score(features),
            spread: spread_score(features),
            liquidity: liquidity_score(features),
        }
    }
}

impl SignalGenerator {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Evaluate ascending `snapshots` for `good_id`.
    ///
    /// The returned signal is stamped with the latest snapshot time; callers
    /// persisting it re-stamp with [`TradeSignal::stamped`].
    pub fn generate(&self, good_id: i64, snapshots: &[PriceSnapshot]) -> Result<TradeSignal, Rejection> {
        if snapshots.len() < MIN_SIGNAL_POINTS {
            return Err(Rejection::InsufficientData {
                required: MIN_SIGNAL_POINTS,
                actual: snapshots.len(),
            });
        }

        let features = FeatureExtractor::extract(snapshots)?;
        let scores = ComponentScores::from_features(&features);
        self.check_thresholds(&scores, &features)?;

        let latest = &snapshots[snapshots.len() - 1];
        let buy_price = latest.buy_price;
        if buy_price <= 0.0 {
            return Err(Rejection::SanityViolation(format!(
                "invalid buy price {:.2}",
                buy_price
            )));
        }

        let predicted_price_7d = features.current_price * (1.0 + features.trend_slope * FORECAST_STEPS);
        let predicted_profit_rate = (predicted_price_7d / buy_price - 1.0 - self.config.fee_rate) * 100.0;
        if !(predicted_profit_rate >= self.config.min_profit_rate) {
            return Err(Rejection::ThresholdNotMet {
                metric: "predicted profit rate",
                value: predicted_profit_rate,
                threshold: self.config.min_profit_rate,
            });
        }

        let strength = signal_strength(scores.trend, scores.spread, scores.liquidity);
        let confidence = calculate_confidence(&[scores.trend, scores.spread, scores.liquidity]);
        let quantity = self.recommended_quantity(confidence, predicted_profit_rate);

        let reason = format!(
            "trend {:.0}%, spread {:.0}%, liquidity {:.0}%, expected profit {:.1}%",
            scores.trend * 100.0,
            scores.spread * 100.0,
            scores.liquidity * 100.0,
            predicted_profit_rate
        );

        Ok(TradeSignal {
            good_id,
            good_name: String::new(),
            current_buy_price: buy_price,
            current_sell_price: features.current_price,
            predicted_price_7d,
            predicted_profit_rate,
            confidence_score: confidence,
            signal_strength: strength,
            trend_score: scores.trend,
            spread_score: scores.spread,
            liquidity_score: scores.liquidity,
            volatility: features.volatility,
            recommended_quantity: quantity,
            max_investment: buy_price * quantity as f64,
            reason,
            strategy_version: String::new(),
            signal_time: latest.timestamp,
            expires_at: latest.timestamp + Duration::hours(SIGNAL_TTL_HOURS),
        })
    }

    fn check_thresholds(&self, scores: &ComponentScores, features: &FeatureSet) -> Result<(), Rejection> {
        let minimums = [
            ("trend score", scores.trend, self.config.trend_threshold),
            ("spread score", scores.spread, self.config.spread_threshold),
            ("liquidity score", scores.liquidity, self.config.liquidity_threshold),
        ];
        for (metric, value, threshold) in minimums {
            if value < threshold {
                return Err(Rejection::ThresholdNotMet {
                    metric,
                    value,
                    threshold,
                });
            }
        }

        if !(features.volatility <= self.config.max_volatility) {
            return Err(Rejection::ThresholdNotMet {
                metric: "volatility",
                value: features.volatility,
                threshold: self.config.max_volatility,
            });
        }
        Ok(())
    }

    fn recommended_quantity(&self, confidence: f64, profit_rate: f64) -> u32 {
        let config = &self.config;
        if confidence < config.high_confidence_threshold || profit_rate < config.high_confidence_min_profit {
            return config.default_quantity;
        }
        if confidence >= TOP_CONFIDENCE {
            config.max_multiple_quantity
        } else {
            ELEVATED_QUANTITY
                .max(config.default_quantity)
                .min(config.max_multiple_quantity)
        }
    }
}
