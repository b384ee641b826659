//! Builds the per-cycle indicator snapshot for one instrument.

use crate::indicators::error::IndicatorError;
use crate::indicators::library::IndicatorLibrary;
use crate::models::indicators::{Candle, IndicatorSnapshot};

pub const TREND_MA_LENGTH: u32 = 60;
pub const BOLLINGER_LENGTH: u32 = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;

/// RSI is required; MA60 and Bollinger are attached when there is enough
/// history and left empty otherwise. Non-finite closes inside the history
/// are skipped, but the latest close must be a real price.
pub fn compute_snapshot(
    library: &dyn IndicatorLibrary,
    candles: &[Candle],
    rsi_length: u32,
) -> Result<IndicatorSnapshot, IndicatorError> {
    let latest = candles.last().ok_or(IndicatorError::EmptySeries)?;
    if !latest.close.is_finite() {
        return Err(IndicatorError::NonFinite("close"));
    }

    let closes: Vec<f64> = candles
        .iter()
        .map(|c| c.close)
        .filter(|c| c.is_finite())
        .collect();
    let current_price = *closes.last().ok_or(IndicatorError::EmptySeries)?;

    let rsi = library
        .rsi(&closes, rsi_length)
        .ok_or(IndicatorError::InsufficientData {
            indicator: "RSI",
            required: rsi_length as usize + 1,
            available: closes.len(),
        })?;
    if !rsi.is_finite() {
        return Err(IndicatorError::NonFinite("RSI"));
    }

    let mut snapshot = IndicatorSnapshot::new(rsi, current_price);

    if let Some(ma60) = library.sma(&closes, TREND_MA_LENGTH).filter(|v| v.is_finite()) {
        snapshot = snapshot.with_ma60(ma60);
    }

    if let Some(bands) = library.bollinger(&closes, BOLLINGER_LENGTH, BOLLINGER_STD_DEV) {
        snapshot = snapshot.with_bollinger(bands.lower, bands.middle, bands.upper);
    }

    Ok(snapshot)
}
