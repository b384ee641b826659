use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }
}

/// Latest traded price for an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Indicator values for one instrument in one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma60: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger: Option<BollingerBands>,
    pub current_price: f64,
}

impl IndicatorSnapshot {
    pub fn new(rsi: f64, current_price: f64) -> Self {
        Self {
            rsi,
            ma60: None,
            bollinger: None,
            current_price,
        }
    }

    pub fn with_ma60(mut self, ma60: f64) -> Self {
        self.ma60 = Some(ma60);
        self
    }

    pub fn with_bollinger(mut self, lower: f64, middle: f64, upper: f64) -> Self {
        self.bollinger = Some(BollingerBands {
            lower,
            middle,
            upper,
        });
        self
    }
}
