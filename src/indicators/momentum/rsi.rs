//! RSI (Relative Strength Index) indicator

/// RSI series using Wilder smoothing.
///
/// RSI = 100 - (100 / (1 + RS)), RS = smoothed gain / smoothed loss.
/// The first value is seeded from the simple mean of the first `period`
/// changes; element `i` of the result corresponds to `closes[period + i]`.
pub fn calculate_rsi_series(closes: &[f64], period: u32) -> Vec<f64> {
    let period = period as usize;
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(changes.len() - period + 1);
    out.push(rsi_from_averages(avg_gain, avg_loss));

    for &change in &changes[period..] {
        avg_gain = (avg_gain * (period as f64 - 1.0) + change.max(0.0)) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + (-change).max(0.0)) / period as f64;
        out.push(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

/// Latest RSI value, `None` with fewer than `period + 1` closes.
pub fn calculate_rsi(closes: &[f64], period: u32) -> Option<f64> {
    calculate_rsi_series(closes, period).last().copied()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return 50.0;
        }
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
