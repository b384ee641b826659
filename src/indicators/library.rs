//! Indicator library seam used by the scanner.

use crate::indicators::momentum::{calculate_macd, calculate_rsi, calculate_rsi_series};
use crate::indicators::trend::calculate_sma;
use crate::indicators::volatility::calculate_bollinger_bands;
use crate::models::indicators::{BollingerBands, MacdValue};

/// Price series → indicator values. `None` means not enough data.
pub trait IndicatorLibrary: Send + Sync {
    fn rsi(&self, closes: &[f64], length: u32) -> Option<f64>;

    fn rsi_series(&self, closes: &[f64], length: u32) -> Vec<f64>;

    fn sma(&self, closes: &[f64], length: u32) -> Option<f64>;

    fn bollinger(&self, closes: &[f64], length: u32, std_dev: f64) -> Option<BollingerBands>;

    fn macd(&self, closes: &[f64], fast: u32, slow: u32, signal: u32) -> Option<MacdValue>;
}

/// Default in-process implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardIndicators;

impl IndicatorLibrary for StandardIndicators {
    fn rsi(&self, closes: &[f64], length: u32) -> Option<f64> {
        calculate_rsi(closes, length)
    }

    fn rsi_series(&self, closes: &[f64], length: u32) -> Vec<f64> {
        calculate_rsi_series(closes, length)
    }

    fn sma(&self, closes: &[f64], length: u32) -> Option<f64> {
        calculate_sma(closes, length)
    }

    fn bollinger(&self, closes: &[f64], length: u32, std_dev: f64) -> Option<BollingerBands> {
        calculate_bollinger_bands(closes, length, std_dev)
    }

    fn macd(&self, closes: &[f64], fast: u32, slow: u32, signal: u32) -> Option<MacdValue> {
        calculate_macd(closes, fast, slow, signal)
    }
}
