//! Queue payload and delivery targets.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Alert message carried by the alarm queue.
///
/// Serialized with the legacy wire names (`stock_code`, `stock_name`, `time`)
/// so other consumers of the same list keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub user_id: i64,
    #[serde(rename = "stock_code")]
    pub instrument_code: String,
    #[serde(rename = "stock_name")]
    pub instrument_name: String,
    pub reason: String,
    pub value: f64,
    pub threshold: f64,
    pub price: f64,
    #[serde(rename = "time")]
    pub timestamp: DateTime<FixedOffset>,
}

impl Alarm {
    /// Plain-text body shared by every notification channel.
    pub fn message(&self) -> String {
        format!(
            "Stock Alert: {} ({})\nReason: {}\nValue: {:.2}\nPrice: {}\nTime: {}",
            self.instrument_name,
            self.instrument_code,
            self.reason,
            self.value,
            self.price,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

/// Where a user's alerts go. Read-only to the worker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotifyTarget {
    pub user_id: i64,
    pub email: Option<String>,
    pub telegram_id: Option<String>,
}
