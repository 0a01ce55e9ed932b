//! Prometheus metrics for the signal and learning pipelines.

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    pub registry: Registry,
    pub database_connected: Gauge,
    pub signals_generated_total: IntCounter,
    pub signal_rejections_total: IntCounterVec,
    pub signal_refresh_duration_seconds: Histogram,
    pub backtest_runs_total: IntCounter,
    pub backtest_trades_total: IntCounter,
    pub learning_runs_total: IntCounterVec,
    pub learning_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let database_connected = Gauge::new(
            "csquant_database_connected",
            "1 when the repository connection is established",
        )?;
        let signals_generated_total = IntCounter::new(
            "csquant_signals_generated_total",
            "Signals that survived scoring and risk checks",
        )?;
        let signal_rejections_total = IntCounterVec::new(
            Opts::new(
                "csquant_signal_rejections_total",
                "Goods rejected during signal generation, by rejection kind",
            ),
            &["kind"],
        )?;
        let signal_refresh_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "csquant_signal_refresh_duration_seconds",
            "Wall time of one generate-and-save cycle",
        ))?;
        let backtest_runs_total =
            IntCounter::new("csquant_backtest_runs_total", "Completed backtest simulations")?;
        let backtest_trades_total = IntCounter::new(
            "csquant_backtest_trades_total",
            "Simulated trades across all backtests",
        )?;
        let learning_runs_total = IntCounterVec::new(
            Opts::new("csquant_learning_runs_total", "Daily learning runs by outcome"),
            &["status"],
        )?;
        let learning_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "csquant_learning_duration_seconds",
                "Wall time of one daily learning run",
            )
            .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        )?;

        registry.register(Box::new(database_connected.clone()))?;
        registry.register(Box::new(signals_generated_total.clone()))?;
        registry.register(Box::new(signal_rejections_total.clone()))?;
        registry.register(Box::new(signal_refresh_duration_seconds.clone()))?;
        registry.register(Box::new(backtest_runs_total.clone()))?;
        registry.register(Box::new(backtest_trades_total.clone()))?;
        registry.register(Box::new(learning_runs_total.clone()))?;
        registry.register(Box::new(learning_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            database_connected,
            signals_generated_total,
            signal_rejections_total,
            signal_refresh_duration_seconds,
            backtest_runs_total,
            backtest_trades_total,
            learning_runs_total,
            learning_duration_seconds,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
