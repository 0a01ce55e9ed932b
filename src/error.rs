//! Error taxonomy for the engine.
//!
//! Business-rule outcomes ([`Rejection`]) are ordinary values. Faults
//! ([`RepositoryError`], [`QuantError`]) propagate to the caller.

use thiserror::Error;

/// Why a good produced no signal, or why a signal was refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("insufficient data: need at least {required} snapshots, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("{metric} {value:.2} misses threshold {threshold:.2}")]
    ThresholdNotMet {
        metric: &'static str,
        value: f64,
        threshold: f64,
    },

    #[error("sanity violation: {0}")]
    SanityViolation(String),

    #[error("position constraint: {0}")]
    PositionConstraint(String),
}

impl Rejection {
    /// Stable label used as a metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::InsufficientData { .. } => "insufficient_data",
            Rejection::ThresholdNotMet { .. } => "threshold_not_met",
            Rejection::SanityViolation(_) => "sanity_violation",
            Rejection::PositionConstraint(_) => "position_constraint",
        }
    }
}

/// Persistence failures surfaced by a [`crate::db::Repository`].
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Engine-level faults.
#[derive(Error, Debug)]
pub enum QuantError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("optimization exhausted: none of {evaluated} candidates met eligibility")]
    OptimizationExhausted { evaluated: usize },

    #[error("strategy validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid strategy config: {0}")]
    InvalidConfig(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type QuantResult<T> = std::result::Result<T, QuantError>;
