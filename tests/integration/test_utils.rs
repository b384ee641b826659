//! Shared fixtures for pipeline tests: scripted upstream, recording
//! notification channel and an in-memory context.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickwatch::config::{ScanConfig, WorkerConfig};
use tickwatch::core::AppContext;
use tickwatch::db::{MemoryInstrumentStore, MemoryNotifyTargetStore};
use tickwatch::metrics::Metrics;
use tickwatch::models::{BarPeriod, Candle, Instrument, InstrumentKind, Tick};
use tickwatch::notify::NotificationChannel;
use tickwatch::queue::MemoryAlarmQueue;
use tickwatch::services::{FetchError, MarketDataProvider, RetryPolicy, RetryingFetcher};

/// 2024-03-05 (Tuesday) 10:00 in Shanghai.
pub fn tuesday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap()
}

/// 2024-03-05 (Tuesday) 12:00 in Shanghai, lunch break.
pub fn tuesday_lunch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 4, 0, 0).unwrap()
}

/// 2024-03-09 (Saturday) 10:00 in Shanghai.
pub fn saturday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 2, 0, 0).unwrap()
}

fn candles_from(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2023, 11, 1, 7, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle::new(c, c, c, c, 10_000.0, start + ChronoDuration::days(i as i64)))
        .collect()
}

/// Falls 4 then recovers 1, repeatedly. RSI(14) ends near 19.
pub fn declining_candles(count: usize) -> Vec<Candle> {
    let mut closes = vec![500.0];
    for i in 0..count.saturating_sub(1) {
        let prev = closes[closes.len() - 1];
        closes.push(if i % 2 == 0 { prev - 4.0 } else { prev + 1.0 });
    }
    candles_from(&closes)
}

/// Constant price, RSI 50.
pub fn flat_candles(count: usize) -> Vec<Candle> {
    candles_from(&vec![100.0; count])
}

enum Script {
    Candles(Vec<Candle>),
    Fail(FetchError),
}

/// Provider whose answers are set per instrument code. Queued failures are
/// returned first, then the configured series.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, Script>>,
    queued_failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
    realtime_price: Mutex<Option<f64>>,
    pub history_calls: AtomicUsize,
    pub realtime_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_history(&self, code: &str, candles: Vec<Candle>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(code.to_string(), Script::Candles(candles));
    }

    pub fn fail_history(&self, code: &str, error: FetchError) {
        self.scripts
            .lock()
            .unwrap()
            .insert(code.to_string(), Script::Fail(error));
    }

    pub fn fail_next(&self, code: &str, error: FetchError) {
        self.queued_failures
            .lock()
            .unwrap()
            .entry(code.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn set_realtime_price(&self, price: f64) {
        *self.realtime_price.lock().unwrap() = Some(price);
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn realtime_calls(&self) -> usize {
        self.realtime_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn history(
        &self,
        code: &str,
        _period: BarPeriod,
        _kind: InstrumentKind,
    ) -> Result<Vec<Candle>, FetchError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self
            .queued_failures
            .lock()
            .unwrap()
            .get_mut(code)
            .and_then(|q| q.pop_front())
        {
            return Err(e);
        }
        match self.scripts.lock().unwrap().get(code) {
            Some(Script::Candles(c)) => Ok(c.clone()),
            Some(Script::Fail(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn realtime(&self, code: &str, _kind: InstrumentKind) -> Result<Option<Tick>, FetchError> {
        self.realtime_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.realtime_price.lock().unwrap().map(|price| Tick {
            code: code.to_string(),
            name: code.to_string(),
            price,
            timestamp: Utc::now(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Telegram { chat_id: String, text: String },
    Email { address: String, subject: String, body: String },
}

/// Records every send; either transport can be told to fail.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    pub fail_telegram: AtomicBool,
    pub fail_email: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn telegrams(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Telegram { chat_id, text } => Some((chat_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn emails(&self) -> Vec<(String, String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Email { address, subject, body } => Some((address, subject, body)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send_email(&self, address: &str, subject: &str, body: &str) -> bool {
        self.sent.lock().unwrap().push(Sent::Email {
            address: address.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        !self.fail_email.load(Ordering::SeqCst)
    }

    async fn send_telegram(&self, chat_id: &str, text: &str) -> bool {
        self.sent.lock().unwrap().push(Sent::Telegram {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        !self.fail_telegram.load(Ordering::SeqCst)
    }
}

/// Everything a pipeline test needs, wired without Redis or Postgres.
pub struct TestPipeline {
    pub ctx: Arc<AppContext>,
    pub store: Arc<MemoryInstrumentStore>,
    pub targets: Arc<MemoryNotifyTargetStore>,
    pub queue: Arc<MemoryAlarmQueue>,
    pub provider: Arc<ScriptedProvider>,
    pub channel: Arc<RecordingChannel>,
    pub metrics: Arc<Metrics>,
}

impl TestPipeline {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self::build(instruments, None)
    }

    pub fn with_fallback_chat(instruments: Vec<Instrument>, chat_id: &str) -> Self {
        Self::build(instruments, Some(chat_id.to_string()))
    }

    fn build(instruments: Vec<Instrument>, fallback_chat_id: Option<String>) -> Self {
        let store = Arc::new(MemoryInstrumentStore::with_instruments(instruments));
        let targets = Arc::new(MemoryNotifyTargetStore::new());
        let queue = Arc::new(MemoryAlarmQueue::new());
        let provider = Arc::new(ScriptedProvider::new());
        let channel = Arc::new(RecordingChannel::new());
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));

        let fetcher = Arc::new(RetryingFetcher::new(
            provider.clone(),
            RetryPolicy::new(3, Duration::ZERO),
        ));

        let ctx = AppContext::new(
            store.clone(),
            targets.clone(),
            fetcher,
            queue.clone(),
            channel.clone(),
            metrics.clone(),
        )
        .with_scan_config(ScanConfig {
            instrument_delay_min: Duration::ZERO,
            instrument_delay_max: Duration::ZERO,
            ..ScanConfig::default()
        })
        .with_worker_config(WorkerConfig {
            pop_timeout: Duration::from_millis(20),
            idle_sleep: Duration::from_millis(5),
        })
        .with_fallback_chat_id(fallback_chat_id);

        Self {
            ctx: Arc::new(ctx),
            store,
            targets,
            queue,
            provider,
            channel,
            metrics,
        }
    }
}

pub fn equity(code: &str, name: &str) -> Instrument {
    Instrument::new(code, name, InstrumentKind::Equity)
}
