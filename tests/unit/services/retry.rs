//! Unit tests for the retry wrapper and the market-hours gate

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickwatch::models::{BarPeriod, Candle, InstrumentKind, Tick};
use tickwatch::services::{
    retry_with_sleeper, FetchError, MarketDataProvider, RetryPolicy, RetryingFetcher,
};

type Sleeps = Arc<Mutex<Vec<Duration>>>;

fn recording_sleeper(sleeps: Sleeps) -> impl Fn(Duration) -> std::future::Ready<()> + 'static {
    move |d: Duration| {
        sleeps.lock().unwrap().push(d);
        std::future::ready(())
    }
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|&s| Duration::from_secs(s)).collect()
}

#[tokio::test]
async fn transient_errors_back_off_exponentially() {
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    let sleeps: Sleeps = Arc::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = retry_with_sleeper(
        &policy,
        "test",
        || {
            let calls = calls.clone();
            async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(FetchError::Transient("timed out".to_string())),
                    _ => Ok(42),
                }
            }
        },
        FetchError::is_transient,
        recording_sleeper(sleeps.clone()),
    )
    .await;

    assert_eq!(tokio_test::assert_ok!(result), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(*sleeps.lock().unwrap(), secs(&[1, 2]));
}

#[tokio::test]
async fn terminal_error_is_not_retried() {
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    let sleeps: Sleeps = Arc::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let result: Result<u32, FetchError> = retry_with_sleeper(
        &policy,
        "test",
        || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Terminal("bad symbol".to_string()))
            }
        },
        FetchError::is_transient,
        recording_sleeper(sleeps.clone()),
    )
    .await;

    let err = tokio_test::assert_err!(result);
    assert_eq!(err, FetchError::Terminal("bad symbol".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sleeps.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exhaustion_returns_last_error() {
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    let sleeps: Sleeps = Arc::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let result: Result<u32, FetchError> = retry_with_sleeper(
        &policy,
        "test",
        || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Transient(format!("connection reset #{}", n)))
            }
        },
        FetchError::is_transient,
        recording_sleeper(sleeps.clone()),
    )
    .await;

    assert_eq!(
        result,
        Err(FetchError::Transient("connection reset #3".to_string()))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(*sleeps.lock().unwrap(), secs(&[1, 2, 4]));
}

#[test]
fn delay_schedule_matches_policy() {
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    assert_eq!(policy.delay_for(0), Duration::ZERO);
    assert_eq!(policy.delay_for(1), Duration::from_secs(1));
    assert_eq!(policy.delay_for(3), Duration::from_secs(4));
}

#[derive(Default)]
struct CountingProvider {
    realtime_calls: AtomicUsize,
}

#[async_trait]
impl MarketDataProvider for CountingProvider {
    async fn history(
        &self,
        _code: &str,
        _period: BarPeriod,
        _kind: InstrumentKind,
    ) -> Result<Vec<Candle>, FetchError> {
        Ok(Vec::new())
    }

    async fn realtime(&self, code: &str, _kind: InstrumentKind) -> Result<Option<Tick>, FetchError> {
        self.realtime_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Tick {
            code: code.to_string(),
            name: code.to_string(),
            price: 10.0,
            timestamp: Utc::now(),
        }))
    }
}

#[tokio::test]
async fn realtime_skipped_outside_sessions() {
    let provider = Arc::new(CountingProvider::default());
    let fetcher = RetryingFetcher::new(provider.clone(), RetryPolicy::new(3, Duration::ZERO));

    // Saturday 10:00 and Tuesday 12:00 in Shanghai.
    let saturday = Utc.with_ymd_and_hms(2024, 3, 9, 2, 0, 0).unwrap();
    let lunch = Utc.with_ymd_and_hms(2024, 3, 5, 4, 0, 0).unwrap();
    assert_eq!(fetcher.realtime("600519", InstrumentKind::Equity, saturday).await, Ok(None));
    assert_eq!(fetcher.realtime("600519", InstrumentKind::Equity, lunch).await, Ok(None));
    assert_eq!(provider.realtime_calls.load(Ordering::SeqCst), 0);

    // Tuesday 09:20, call auction.
    let auction = Utc.with_ymd_and_hms(2024, 3, 5, 1, 20, 0).unwrap();
    let tick = fetcher
        .realtime("600519", InstrumentKind::Equity, auction)
        .await
        .unwrap();
    assert_eq!(tick.map(|t| t.price), Some(10.0));
    assert_eq!(provider.realtime_calls.load(Ordering::SeqCst), 1);
}
