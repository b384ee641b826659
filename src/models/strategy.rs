//! Per-instrument alert strategy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bar size used for the RSI history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BarPeriod {
    #[default]
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "60")]
    Minutes60,
    #[serde(rename = "30")]
    Minutes30,
}

impl BarPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarPeriod::Daily => "daily",
            BarPeriod::Weekly => "weekly",
            BarPeriod::Monthly => "monthly",
            BarPeriod::Minutes60 => "60",
            BarPeriod::Minutes30 => "30",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "daily" => Some(BarPeriod::Daily),
            "weekly" => Some(BarPeriod::Weekly),
            "monthly" => Some(BarPeriod::Monthly),
            "60" => Some(BarPeriod::Minutes60),
            "30" => Some(BarPeriod::Minutes30),
            _ => None,
        }
    }
}

impl fmt::Display for BarPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("rsi_low ({low}) must be below rsi_high ({high})")]
    ThresholdOrder { low: f64, high: f64 },
    #[error("rsi_length must be >= 1")]
    ZeroLength,
}

/// Alert configuration for one instrument (1:1 by `instrument_code`).
///
/// Only `last_notify_time` is written by the scanner; every other field is
/// owned by whoever manages strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub instrument_code: String,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub rsi_period: BarPeriod,
    pub rsi_length: u32,
    pub enable_push: bool,
    pub enable_trend_filter: bool,
    pub enable_volatility_filter: bool,
    pub cooldown_period_minutes: u32,
    pub last_notify_time: Option<DateTime<Utc>>,
}

impl StrategyConfig {
    pub const DEFAULT_RSI_LOW: f64 = 30.0;
    pub const DEFAULT_RSI_HIGH: f64 = 70.0;
    pub const DEFAULT_RSI_LENGTH: u32 = 14;
    pub const DEFAULT_COOLDOWN_MINUTES: u32 = 30;

    /// The strategy created for an instrument that has none yet.
    pub fn default_for(code: impl Into<String>) -> Self {
        Self {
            instrument_code: code.into(),
            rsi_low: Self::DEFAULT_RSI_LOW,
            rsi_high: Self::DEFAULT_RSI_HIGH,
            rsi_period: BarPeriod::Daily,
            rsi_length: Self::DEFAULT_RSI_LENGTH,
            enable_push: true,
            enable_trend_filter: false,
            enable_volatility_filter: false,
            cooldown_period_minutes: Self::DEFAULT_COOLDOWN_MINUTES,
            last_notify_time: None,
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(self.rsi_low < self.rsi_high) {
            return Err(StrategyError::ThresholdOrder {
                low: self.rsi_low,
                high: self.rsi_high,
            });
        }
        if self.rsi_length == 0 {
            return Err(StrategyError::ZeroLength);
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(i64::from(self.cooldown_period_minutes))
    }

    /// True while the previous accepted alert is younger than the cooldown.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_notify_time {
            Some(last) => now - last < self.cooldown(),
            None => false,
        }
    }
}
