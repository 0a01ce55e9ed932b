//! Tracing subscriber setup for the worker binary.
//!
//! Engine components only emit events; nothing below runs unless the binary
//! calls [`init_logging`].

use crate::config::get_environment;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter applied when `RUST_LOG` is unset. Connection chatter stays quiet.
pub const DEFAULT_FILTER: &str = "info,tokio_postgres=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened for log aggregation.
    Json,
    /// Colored human-readable lines.
    Pretty,
}

impl LogFormat {
    pub fn for_environment(env: &str) -> Self {
        match env {
            "production" | "prod" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber for `ENVIRONMENT`.
pub fn init_logging() {
    init_with(LogFormat::for_environment(&get_environment()));
}

pub fn init_with(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stdout),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .init(),
    }
}
