//! MACD (Moving Average Convergence Divergence) indicator

use crate::common::math;
use crate::models::indicators::MacdValue;

/// Calculate MACD indicator
///
/// MACD = EMA(fast) - EMA(slow)
/// Signal = EMA(signal) of MACD
/// Histogram = MACD - Signal
pub fn calculate_macd(
    closes: &[f64],
    fast_period: u32,
    slow_period: u32,
    signal_period: u32,
) -> Option<MacdValue> {
    let (fast, slow, signal) = (
        fast_period as usize,
        slow_period as usize,
        signal_period as usize,
    );
    if fast == 0 || signal == 0 || fast >= slow || closes.len() < slow + signal - 1 {
        return None;
    }

    let fast_series = math::ema_series(closes, fast);
    let slow_series = math::ema_series(closes, slow);

    // Align: fast_series starts at index fast-1, slow_series at slow-1.
    let offset = slow - fast;
    let macd_values: Vec<f64> = slow_series
        .iter()
        .enumerate()
        .map(|(i, slow_v)| fast_series[i + offset] - slow_v)
        .collect();

    let signal_line = math::ema(&macd_values, signal)?;
    let macd_line = *macd_values.last()?;

    Some(MacdValue {
        macd: macd_line,
        signal: signal_line,
        histogram: macd_line - signal_line,
    })
}
