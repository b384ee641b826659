//! Bounded exponential-backoff retry around upstream fetches.
//!
//! Delay before retry `n` (1-based) is `base_delay * 2^(n-1)`; only errors the
//! predicate calls transient are retried, everything else propagates at once.

use crate::config::RetryConfig;
use crate::core::trading_hours;
use crate::metrics::Metrics;
use crate::models::indicators::{Candle, Tick};
use crate::models::instrument::InstrumentKind;
use crate::models::strategy::BarPeriod;
use crate::services::market_data::{FetchError, MarketDataProvider};
use backon::{ExponentialBuilder, Retryable, Sleeper};
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay slept before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let shift = (attempt - 1).min(31) as u32;
        self.base_delay.saturating_mul(1u32 << shift)
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_factor(2.0)
            .with_max_delay(self.delay_for(self.max_retries.max(1)))
            .with_max_times(self.max_retries)
    }
}

fn tokio_sleep(dur: Duration) -> tokio::time::Sleep {
    tokio::time::sleep(dur)
}

/// Run `op`, retrying failures `is_transient` accepts, sleeping on tokio's timer.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, label: &str, op: F, is_transient: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    run(policy, label, op, is_transient, tokio_sleep, None).await
}

/// Same as [`retry`] with an injectable sleeper.
pub async fn retry_with_sleeper<T, E, F, Fut, P, SN>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
    is_transient: P,
    sleeper: SN,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
    SN: Sleeper,
{
    run(policy, label, op, is_transient, sleeper, None).await
}

async fn run<T, E, F, Fut, P, SN>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
    is_transient: P,
    sleeper: SN,
    metrics: Option<&Metrics>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
    SN: Sleeper,
{
    let mut attempt = 0usize;
    let max_retries = policy.max_retries;

    op.retry(policy.backoff())
        .sleep(sleeper)
        .when(|e: &E| is_transient(e))
        .notify(|e: &E, delay: Duration| {
            attempt += 1;
            if let Some(metrics) = metrics {
                metrics.fetch_retries_total.inc();
            }
            warn!(
                label = %label,
                attempt = attempt,
                max_retries = max_retries,
                delay_secs = delay.as_secs_f64(),
                error = %e,
                "RetryingFetcher: {} failed ({}), retry {}/{} in {:.1}s",
                label,
                e,
                attempt,
                max_retries,
                delay.as_secs_f64()
            );
        })
        .await
}

/// Upstream provider wrapped with retry and the market-hours gate.
pub struct RetryingFetcher {
    provider: Arc<dyn MarketDataProvider>,
    policy: RetryPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl RetryingFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Historical bars. Not gated by market hours.
    pub async fn history(
        &self,
        code: &str,
        period: BarPeriod,
        kind: InstrumentKind,
    ) -> Result<Vec<Candle>, FetchError> {
        let label = format!("history {} ({}, {})", code, period, kind);
        run(
            &self.policy,
            &label,
            || self.provider.history(code, period, kind),
            FetchError::is_transient,
            tokio_sleep,
            self.metrics.as_deref(),
        )
        .await
    }

    /// Latest price, or `Ok(None)` without any network call while the
    /// market is closed at `now`.
    pub async fn realtime(
        &self,
        code: &str,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> Result<Option<Tick>, FetchError> {
        let local = trading_hours::to_exchange_time(now);
        if !trading_hours::should_use_realtime_api(&local) {
            debug!(
                code = %code,
                status = %trading_hours::status(&local),
                "RetryingFetcher: market closed, real-time quote for {} unavailable",
                code
            );
            return Ok(None);
        }

        let label = format!("realtime {} ({})", code, kind);
        run(
            &self.policy,
            &label,
            || self.provider.realtime(code, kind),
            FetchError::is_transient,
            tokio_sleep,
            self.metrics.as_deref(),
        )
        .await
    }
}
