//! Bollinger Bands indicator

use crate::common::math;
use crate::models::indicators::BollingerBands;

/// Calculate Bollinger Bands
///
/// Middle Band = SMA(period)
/// Upper Band = Middle + (std_dev * standard deviation)
/// Lower Band = Middle - (std_dev * standard deviation)
pub fn calculate_bollinger_bands(closes: &[f64], period: u32, std_dev: f64) -> Option<BollingerBands> {
    let middle = math::sma(closes, period as usize)?;
    let std = math::standard_deviation(closes, period as usize)?;

    Some(BollingerBands {
        upper: middle + (std_dev * std),
        middle,
        lower: middle - (std_dev * std),
    })
}
