//! Market data provider interface and fetch error classification.

use crate::models::indicators::{Candle, Tick};
use crate::models::instrument::InstrumentKind;
use crate::models::strategy::BarPeriod;
use async_trait::async_trait;
use thiserror::Error;

const TRANSIENT_PATTERNS: &[&str] = &[
    "connection",
    "timed out",
    "timeout",
    "reset",
    "refused",
    "broken pipe",
    "temporarily unavailable",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network-level failure worth retrying.
    #[error("transient network error: {0}")]
    Transient(String),
    /// Anything retrying will not fix (bad symbol, malformed payload, 4xx).
    #[error("fetch failed: {0}")]
    Terminal(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    /// Classify a free-form error message by connection/timeout patterns.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_transient_message(&message) {
            FetchError::Transient(message)
        } else {
            FetchError::Terminal(message)
        }
    }

    /// Classify an HTTP status returned by an upstream.
    pub fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        let message = format!("{} returned HTTP {}", context, status);
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            FetchError::Transient(message)
        } else {
            FetchError::Terminal(message)
        }
    }
}

pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p))
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            return FetchError::Transient(e.to_string());
        }
        if let Some(status) = e.status() {
            return FetchError::from_status(status, "upstream");
        }
        if e.is_decode() || e.is_body() {
            return FetchError::Terminal(e.to_string());
        }
        FetchError::from_message(e.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match e.kind() {
            ConnectionReset | ConnectionRefused | ConnectionAborted | TimedOut | BrokenPipe
            | NotConnected | UnexpectedEof | Interrupted => FetchError::Transient(e.to_string()),
            _ => FetchError::from_message(e.to_string()),
        }
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Historical bars, oldest first. An empty vec means no data.
    async fn history(
        &self,
        code: &str,
        period: BarPeriod,
        kind: InstrumentKind,
    ) -> Result<Vec<Candle>, FetchError>;

    /// Latest price, `None` when the upstream has nothing for the code.
    async fn realtime(&self, code: &str, kind: InstrumentKind) -> Result<Option<Tick>, FetchError>;
}
