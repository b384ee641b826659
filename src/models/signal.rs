use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Buy,
    Sell,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "buy",
            SignalType::Sell => "sell",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend classification produced by the trend filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendLabel {
    Uptrend,
    Downtrend,
    /// Filter enabled but MA60 could not be computed.
    Unknown,
    /// Filter disabled for this strategy.
    #[serde(rename = "N/A")]
    NotApplied,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendLabel::Uptrend => "Uptrend",
            TrendLabel::Downtrend => "Downtrend",
            TrendLabel::Unknown => "Unknown",
            TrendLabel::NotApplied => "N/A",
        };
        f.write_str(s)
    }
}

/// A fired signal, consumed immediately by the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub signal_type: SignalType,
    pub reason: String,
    pub detail: String,
    pub rsi: f64,
    pub price: f64,
    pub trend_label: TrendLabel,
    /// The threshold actually compared against, after trend adjustment.
    pub threshold: f64,
}
