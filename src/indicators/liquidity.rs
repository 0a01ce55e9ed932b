/// Minimum absolute move between consecutive samples that counts as a change.
pub const PRICE_CHANGE_EPSILON: f64 = 0.01;

/// Share of consecutive samples whose price moved by more than
/// [`PRICE_CHANGE_EPSILON`]. The denominator is the window length.
pub fn price_change_frequency(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    let changes = prices
        .windows(2)
        .filter(|pair| (pair[1] - pair[0]).abs() > PRICE_CHANGE_EPSILON)
        .count();
    changes as f64 / prices.len() as f64
}
