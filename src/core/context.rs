//! Process-wide context, built once at boot and shared by the scanner,
//! the scheduler, the worker and the HTTP surface.

use crate::config::{AppConfig, ScanConfig, WorkerConfig};
use crate::db::{
    InstrumentStore, MemoryInstrumentStore, MemoryNotifyTargetStore, NotifyTargetStore, PostgresStore,
};
use crate::indicators::{IndicatorLibrary, StandardIndicators};
use crate::metrics::Metrics;
use crate::notify::{NotificationChannel, Notifier};
use crate::queue::{AlarmQueue, RedisAlarmQueue};
use crate::services::{EastmoneyProvider, RetryPolicy, RetryingFetcher};
use std::sync::Arc;
use tracing::{info, warn};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct AppContext {
    pub instruments: Arc<dyn InstrumentStore>,
    pub notify_targets: Arc<dyn NotifyTargetStore>,
    pub fetcher: Arc<RetryingFetcher>,
    pub indicators: Arc<dyn IndicatorLibrary>,
    pub queue: Arc<dyn AlarmQueue>,
    pub channel: Arc<dyn NotificationChannel>,
    pub metrics: Arc<Metrics>,
    pub scan: ScanConfig,
    pub worker: WorkerConfig,
    /// Chat that receives Telegram alerts for users without their own id.
    pub telegram_fallback_chat_id: Option<String>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("scan", &self.scan)
            .field("worker", &self.worker)
            .field("telegram_fallback_chat_id", &self.telegram_fallback_chat_id)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Context over explicit collaborators with default pacing and the
    /// standard indicator library.
    pub fn new(
        instruments: Arc<dyn InstrumentStore>,
        notify_targets: Arc<dyn NotifyTargetStore>,
        fetcher: Arc<RetryingFetcher>,
        queue: Arc<dyn AlarmQueue>,
        channel: Arc<dyn NotificationChannel>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            instruments,
            notify_targets,
            fetcher,
            indicators: Arc::new(StandardIndicators),
            queue,
            channel,
            metrics,
            scan: ScanConfig::default(),
            worker: WorkerConfig::default(),
            telegram_fallback_chat_id: None,
        }
    }

    pub fn with_scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_worker_config(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_indicators(mut self, indicators: Arc<dyn IndicatorLibrary>) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn with_fallback_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.telegram_fallback_chat_id = chat_id;
        self
    }

    /// Wire the production collaborators from configuration.
    ///
    /// Without `DATABASE_URL` the stores are empty in-memory ones, which is
    /// only useful for running the worker against a shared queue.
    pub async fn from_config(config: &AppConfig) -> Result<Self, BoxError> {
        let metrics = Arc::new(Metrics::new().map_err(|e| format!("failed to build metrics registry: {}", e))?);

        let (instruments, notify_targets): (Arc<dyn InstrumentStore>, Arc<dyn NotifyTargetStore>) =
            match &config.database_url {
                Some(url) => {
                    let store = Arc::new(PostgresStore::connect(url).await?);
                    info!("AppContext: Postgres connected");
                    (
                        store.clone() as Arc<dyn InstrumentStore>,
                        store as Arc<dyn NotifyTargetStore>,
                    )
                }
                None => {
                    warn!("AppContext: DATABASE_URL not set, using empty in-memory stores");
                    (
                        Arc::new(MemoryInstrumentStore::new()) as Arc<dyn InstrumentStore>,
                        Arc::new(MemoryNotifyTargetStore::new()) as Arc<dyn NotifyTargetStore>,
                    )
                }
            };

        let provider = Arc::new(EastmoneyProvider::new(config.market_data_url.clone())?);
        let fetcher = Arc::new(
            RetryingFetcher::new(provider, RetryPolicy::from(config.retry)).with_metrics(metrics.clone()),
        );

        let queue = Arc::new(RedisAlarmQueue::new(&config.redis_url, config.queue_key.clone())?);
        info!(key = %config.queue_key, "AppContext: alarm queue on Redis list {}", config.queue_key);

        if config.telegram.is_none() {
            warn!("AppContext: TELEGRAM_BOT_TOKEN not set, Telegram delivery disabled");
        }
        if config.smtp.is_none() {
            warn!("AppContext: SMTP_HOST/SMTP_USER not set, email delivery disabled");
        }
        let notifier = Notifier::new(config.telegram.as_ref(), config.smtp.clone())?
            .with_metrics(metrics.clone());

        Ok(Self::new(
            instruments,
            notify_targets,
            fetcher,
            queue,
            Arc::new(notifier),
            metrics,
        )
        .with_scan_config(config.scan.clone())
        .with_worker_config(config.worker)
        .with_fallback_chat_id(
            config
                .telegram
                .as_ref()
                .and_then(|t| t.fallback_chat_id.clone()),
        ))
    }
}
