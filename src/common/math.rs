//! Numeric helpers shared by indicators, scoring and backtest metrics.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Simple moving average over the trailing `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    mean(&values[values.len() - period..])
}

/// Population variance.
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values. Shorter input falls back to the plain mean.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() || period == 0 {
        return None;
    }
    if values.len() < period {
        return mean(values);
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = mean(&values[..period])?;
    for value in &values[period..] {
        ema = value * multiplier + ema * (1.0 - multiplier);
    }
    Some(ema)
}

/// Standard deviation over mean, in percent. 0 when the mean is not positive
/// or fewer than two values exist.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    match (mean(values), std_dev(values)) {
        (Some(m), Some(sd)) if m > 0.0 => sd / m * 100.0,
        _ => 0.0,
    }
}

/// Ordinary least squares fit of `values` against their index.
///
/// Returns `(slope, r_squared)`. R² is floored at 0 and is 0 for a flat series.
pub fn linear_trend(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n < 2 {
        return (0.0, 0.0);
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, v) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += v;
        sum_xy += x * v;
        sum_x2 += x * x;
    }

    let n_f = n as f64;
    let denominator = n_f * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return (0.0, 0.0);
    }
    let slope = (n_f * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n_f;

    let mean_y = sum_y / n_f;
    let (mut ss_total, mut ss_residual) = (0.0, 0.0);
    for (i, v) in values.iter().enumerate() {
        let predicted = slope * i as f64 + intercept;
        ss_total += (v - mean_y).powi(2);
        ss_residual += (v - predicted).powi(2);
    }

    let r_squared = if ss_total > 0.0 {
        1.0 - ss_residual / ss_total
    } else {
        0.0
    };

    (slope, r_squared.max(0.0))
}

/// Percent change from `from` to `to`; 0 when `from` is 0.
pub fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
