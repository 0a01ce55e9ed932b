//! Named parameter axes and their cartesian product.

use crate::common::math::clamp;
use crate::models::StrategyConfig;
use serde_json::{Map, Value};

/// Perturbations applied around a production config by the quick search.
pub const QUICK_OFFSETS: [f64; 3] = [-0.1, 0.0, 0.1];
/// Bounds every perturbed score threshold is clamped into.
pub const THRESHOLD_BOUNDS: (f64, f64) = (0.3, 0.9);

/// A tunable field of [`StrategyConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    TrendThreshold,
    SpreadThreshold,
    LiquidityThreshold,
    MinProfitRate,
    MaxVolatility,
}

impl Param {
    pub const ALL: [Param; 5] = [
        Param::TrendThreshold,
        Param::SpreadThreshold,
        Param::LiquidityThreshold,
        Param::MinProfitRate,
        Param::MaxVolatility,
    ];

    pub const THRESHOLDS: [Param; 3] = [
        Param::TrendThreshold,
        Param::SpreadThreshold,
        Param::LiquidityThreshold,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Param::TrendThreshold => "trend_threshold",
            Param::SpreadThreshold => "spread_threshold",
            Param::LiquidityThreshold => "liquidity_threshold",
            Param::MinProfitRate => "min_profit_rate",
            Param::MaxVolatility => "max_volatility",
        }
    }

    pub fn get(&self, config: &StrategyConfig) -> f64 {
        match self {
            Param::TrendThreshold => config.trend_threshold,
            Param::SpreadThreshold => config.spread_threshold,
            Param::LiquidityThreshold => config.liquidity_threshold,
            Param::MinProfitRate => config.min_profit_rate,
            Param::MaxVolatility => config.max_volatility,
        }
    }

    pub fn apply(&self, config: &mut StrategyConfig, value: f64) {
        match self {
            Param::TrendThreshold => config.trend_threshold = value,
            Param::SpreadThreshold => config.spread_threshold = value,
            Param::LiquidityThreshold => config.liquidity_threshold = value,
            Param::MinProfitRate => config.min_profit_rate = value,
            Param::MaxVolatility => config.max_volatility = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamAxis {
    pub param: Param,
    pub values: Vec<f64>,
}

/// Cartesian product of axes applied on top of a base config.
///
/// Candidates are produced in nested-loop order: the first axis varies
/// slowest, the last fastest.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    base: StrategyConfig,
    axes: Vec<ParamAxis>,
}

impl ParamGrid {
    pub fn new(base: StrategyConfig) -> Self {
        Self {
            base,
            axes: Vec::new(),
        }
    }

    pub fn axis(mut self, param: Param, values: Vec<f64>) -> Self {
        self.axes.push(ParamAxis { param, values });
        self
    }

    /// The exhaustive five-axis search space.
    pub fn full(base: StrategyConfig) -> Self {
        Self::new(base)
            .axis(Param::TrendThreshold, vec![0.5, 0.6, 0.7])
            .axis(Param::SpreadThreshold, vec![0.4, 0.5, 0.6])
            .axis(Param::LiquidityThreshold, vec![0.6, 0.7, 0.8])
            .axis(Param::MinProfitRate, vec![2.5, 3.0, 3.5])
            .axis(Param::MaxVolatility, vec![12.0, 15.0, 18.0])
    }

    /// The three score thresholds of `base`, each shifted by [`QUICK_OFFSETS`]
    /// and clamped into [`THRESHOLD_BOUNDS`].
    pub fn neighbourhood(base: StrategyConfig) -> Self {
        let (lo, hi) = THRESHOLD_BOUNDS;
        let mut grid = Self::new(base);
        for param in Param::THRESHOLDS {
            let current = param.get(&grid.base);
            let values = QUICK_OFFSETS
                .iter()
                .map(|offset| clamp(current + offset, lo, hi))
                .collect();
            grid = grid.axis(param, values);
        }
        grid
    }

    pub fn base(&self) -> &StrategyConfig {
        &self.base
    }

    pub fn axes(&self) -> &[ParamAxis] {
        &self.axes
    }

    pub fn size(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    pub fn combinations(&self) -> Combinations<'_> {
        Combinations {
            grid: self,
            indices: vec![0; self.axes.len()],
            done: self.axes.iter().any(|a| a.values.is_empty()),
        }
    }
}

pub struct Combinations<'a> {
    grid: &'a ParamGrid,
    indices: Vec<usize>,
    done: bool,
}

impl Iterator for Combinations<'_> {
    type Item = StrategyConfig;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut config = self.grid.base.clone();
        for (axis, &i) in self.grid.axes.iter().zip(&self.indices) {
            axis.param.apply(&mut config, axis.values[i]);
        }

        // Odometer step, last axis fastest.
        self.done = true;
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.grid.axes[pos].values.len() {
                self.done = false;
                break;
            }
            self.indices[pos] = 0;
        }

        Some(config)
    }
}

/// The tuned fields of `config` as a JSON object, for learning logs.
pub fn tuned_params(config: &StrategyConfig) -> Value {
    let map: Map<String, Value> = Param::ALL
        .iter()
        .map(|p| (p.name().to_string(), Value::from(p.get(config))))
        .collect();
    Value::Object(map)
}
