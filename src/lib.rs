//! csquant: statistical buy-signal engine for tradeable virtual goods.
//!
//! Feature extraction, signal scoring, risk gating, walk-forward backtesting,
//! parameter search and the daily re-learning loop. Persistence sits behind
//! the [`db::Repository`] trait.

pub mod backtest;
pub mod common;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod indicators;
pub mod learning;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod risk;
pub mod signals;
pub mod strategies;

pub use error::{QuantError, QuantResult, Rejection, RepositoryError};
