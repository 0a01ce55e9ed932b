//! Strategy tunables and versioning

use crate::error::QuantError;
use crate::models::backtest::BacktestSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version reported when no strategy has been activated yet.
pub const DEFAULT_STRATEGY_VERSION: &str = "v1.0.0";

/// Immutable strategy parameters. Rates and volatility caps are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub train_days: u32,
    pub test_days: u32,

    pub trend_threshold: f64,
    pub spread_threshold: f64,
    pub liquidity_threshold: f64,

    pub min_profit_rate: f64,

    pub max_volatility: f64,
    pub max_drawdown: f64,
    pub max_position_size: f64,

    pub max_items_per_good: u32,
    pub default_quantity: u32,
    pub high_confidence_threshold: f64,
    pub high_confidence_min_profit: f64,
    pub max_multiple_quantity: u32,

    /// Fixed holding period (platform trade lock), in days.
    pub cooldown_days: u32,
    /// Fraction charged once on exit.
    pub fee_rate: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            train_days: 30,
            test_days: 7,
            trend_threshold: 0.6,
            spread_threshold: 0.5,
            liquidity_threshold: 0.7,
            min_profit_rate: 3.0,
            max_volatility: 15.0,
            max_drawdown: 5.0,
            max_position_size: 1000.0,
            max_items_per_good: 3,
            default_quantity: 1,
            high_confidence_threshold: 0.95,
            high_confidence_min_profit: 5.0,
            max_multiple_quantity: 3,
            cooldown_days: 7,
            fee_rate: 0.01,
        }
    }
}

impl StrategyConfig {
    /// Holding period in hourly samples.
    pub fn cooldown_hours(&self) -> usize {
        self.cooldown_days as usize * 24
    }

    /// Reject configurations no run should ever be started with.
    pub fn validate(&self) -> Result<(), QuantError> {
        let unit_fields = [
            ("trend_threshold", self.trend_threshold),
            ("spread_threshold", self.spread_threshold),
            ("liquidity_threshold", self.liquidity_threshold),
            ("high_confidence_threshold", self.high_confidence_threshold),
        ];
        for (name, value) in unit_fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(QuantError::InvalidConfig(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }

        if !self.fee_rate.is_finite() || !(0.0..1.0).contains(&self.fee_rate) {
            return Err(QuantError::InvalidConfig(format!(
                "fee_rate must lie in [0, 1), got {}",
                self.fee_rate
            )));
        }
        if !(self.max_volatility > 0.0) || !(self.max_position_size > 0.0) {
            return Err(QuantError::InvalidConfig(
                "max_volatility and max_position_size must be positive".to_string(),
            ));
        }
        if !(self.max_drawdown >= 0.0) || !self.min_profit_rate.is_finite() {
            return Err(QuantError::InvalidConfig(
                "max_drawdown must be non-negative and min_profit_rate finite".to_string(),
            ));
        }
        if self.cooldown_days == 0 {
            return Err(QuantError::InvalidConfig("cooldown_days must be at least 1".to_string()));
        }
        if self.max_items_per_good == 0 || self.default_quantity == 0 {
            return Err(QuantError::InvalidConfig(
                "max_items_per_good and default_quantity must be at least 1".to_string(),
            ));
        }
        if self.max_multiple_quantity < self.default_quantity {
            return Err(QuantError::InvalidConfig(format!(
                "max_multiple_quantity ({}) below default_quantity ({})",
                self.max_multiple_quantity, self.default_quantity
            )));
        }
        Ok(())
    }
}

/// Lifecycle of a minted strategy version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    Training,
    Validating,
    Active,
    Archived,
}

impl StrategyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyStatus::Training => "training",
            StrategyStatus::Validating => "validating",
            StrategyStatus::Active => "active",
            StrategyStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "training" => Some(StrategyStatus::Training),
            "validating" => Some(StrategyStatus::Validating),
            "active" => Some(StrategyStatus::Active),
            "archived" => Some(StrategyStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyVersion {
    pub id: Option<i64>,
    pub version: String,
    pub config: StrategyConfig,
    pub status: StrategyStatus,
    pub backtest_metrics: Option<BacktestSummary>,
    pub validation_start_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl StrategyVersion {
    /// A freshly minted version in `training`.
    pub fn training(version: String, config: StrategyConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            version,
            config,
            status: StrategyStatus::Training,
            backtest_metrics: None,
            validation_start_time: None,
            created_at: now,
            activated_at: None,
        }
    }

    /// Move to `validating` once a backtest has passed.
    pub fn into_validating(mut self, metrics: BacktestSummary, now: DateTime<Utc>) -> Self {
        self.status = StrategyStatus::Validating;
        self.backtest_metrics = Some(metrics);
        self.validation_start_time = Some(now);
        self
    }

    /// Fallback used when the repository has no active version.
    pub fn default_active(now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            version: DEFAULT_STRATEGY_VERSION.to_string(),
            config: StrategyConfig::default(),
            status: StrategyStatus::Active,
            backtest_metrics: None,
            validation_start_time: None,
            created_at: now,
            activated_at: Some(now),
        }
    }

    /// Name for a version minted at `now`, e.g. `v20240131_020000`.
    pub fn name_for(now: DateTime<chrono::Local>) -> String {
        format!("v{}", now.format("%Y%m%d_%H%M%S"))
    }
}
