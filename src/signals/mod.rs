//! Buy-signal scoring.

pub mod scoring;
pub mod signal_generator;

pub use scoring::*;
pub use signal_generator::{ComponentScores, SignalGenerator, MIN_SIGNAL_POINTS};
