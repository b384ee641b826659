//! SMA (Simple Moving Average) indicator

use crate::common::math;

pub fn calculate_sma(closes: &[f64], period: u32) -> Option<f64> {
    math::sma(closes, period as usize)
}
