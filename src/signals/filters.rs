//! Trend and volatility filters layered over the base RSI rule.
//!
//! Neither filter can create a signal. The trend filter only moves the buy
//! threshold; the volatility filter only annotates a signal that already fired.

use crate::models::indicators::IndicatorSnapshot;
use crate::models::signal::{SignalType, TrendLabel};

/// Points added to (uptrend) or removed from (downtrend) `rsi_low`.
pub const TREND_THRESHOLD_SHIFT: f64 = 5.0;

pub const LOWER_BAND_TOUCH: &str = "Price touched BB Lower Band";
pub const UPPER_BAND_TOUCH: &str = "Price touched BB Upper Band";

/// Buy threshold after the trend filter ran.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAdjustment {
    pub effective_low: f64,
    pub label: TrendLabel,
    pub note: Option<String>,
}

impl TrendAdjustment {
    pub fn unchanged(rsi_low: f64) -> Self {
        Self {
            effective_low: rsi_low,
            label: TrendLabel::NotApplied,
            note: None,
        }
    }
}

pub struct TrendFilter;

impl TrendFilter {
    /// Price above MA60 loosens the buy threshold, at or below tightens it.
    /// Without MA60 the threshold is left alone and the label is `Unknown`.
    pub fn apply(snapshot: &IndicatorSnapshot, rsi_low: f64) -> TrendAdjustment {
        match snapshot.ma60.filter(|m| m.is_finite()) {
            Some(ma60) if snapshot.current_price > ma60 => TrendAdjustment {
                effective_low: rsi_low + TREND_THRESHOLD_SHIFT,
                label: TrendLabel::Uptrend,
                note: Some(format!(
                    "price {:.2} > MA60 {:.2}, buy threshold {:.2}",
                    snapshot.current_price,
                    ma60,
                    rsi_low + TREND_THRESHOLD_SHIFT
                )),
            },
            Some(ma60) => TrendAdjustment {
                effective_low: rsi_low - TREND_THRESHOLD_SHIFT,
                label: TrendLabel::Downtrend,
                note: Some(format!(
                    "price {:.2} <= MA60 {:.2}, buy threshold {:.2}",
                    snapshot.current_price,
                    ma60,
                    rsi_low - TREND_THRESHOLD_SHIFT
                )),
            },
            None => TrendAdjustment {
                effective_low: rsi_low,
                label: TrendLabel::Unknown,
                note: Some("MA60 unavailable, trend filter not applied".to_string()),
            },
        }
    }
}

pub struct VolatilityFilter;

impl VolatilityFilter {
    /// Band-touch qualifier for a fired signal, if the price sits on the
    /// matching Bollinger band.
    pub fn qualifier(signal: SignalType, snapshot: &IndicatorSnapshot) -> Option<&'static str> {
        let bands = snapshot.bollinger?;
        let price = snapshot.current_price;
        match signal {
            SignalType::Buy if price <= bands.lower => Some(LOWER_BAND_TOUCH),
            SignalType::Sell if price >= bands.upper => Some(UPPER_BAND_TOUCH),
            _ => None,
        }
    }
}
