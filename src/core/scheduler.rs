//! Timer that triggers scan cycles.
//!
//! Ticks come either from a cron schedule or from a fixed interval with
//! uniform random jitter. Each tick starts a cycle in its own task so a slow
//! cycle never delays the next tick; a semaphore caps how many cycles can
//! run at once and ticks beyond the cap are dropped.

use crate::config::ScanConfig;
use crate::core::scanner::Scanner;
use crate::metrics::Metrics;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

const MIN_TICK: Duration = Duration::from_secs(1);

pub struct ScanScheduler {
    scanner: Arc<Scanner>,
    config: ScanConfig,
    metrics: Arc<Metrics>,
    permits: Arc<Semaphore>,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl ScanScheduler {
    pub fn new(scanner: Arc<Scanner>, config: ScanConfig, metrics: Arc<Metrics>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_cycles.max(1)));
        Self {
            scanner,
            config,
            metrics,
            permits,
            handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Start ticking. Calling `start` on a running scheduler is a no-op.
    pub async fn start(&self) {
        let mut slot = self.handle.write().await;
        if slot.is_some() {
            warn!("ScanScheduler: already running");
            return;
        }

        let scanner = self.scanner.clone();
        let config = self.config.clone();
        let metrics = self.metrics.clone();
        let permits = self.permits.clone();

        match &config.cron {
            Some(schedule) => info!(cron = %schedule, "ScanScheduler: started on cron schedule"),
            None => info!(
                interval_secs = config.interval.as_secs(),
                jitter_secs = config.jitter.as_secs(),
                max_concurrent = config.max_concurrent_cycles,
                "ScanScheduler: started, every {}s ± {}s",
                config.interval.as_secs(),
                config.jitter.as_secs()
            ),
        }

        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(next_delay(&config)).await;
                trigger(&scanner, &permits, &metrics);
            }
        }));
    }

    /// Stop ticking. Cycles already running finish on their own.
    pub async fn stop(&self) {
        if let Some(h) = self.handle.write().await.take() {
            h.abort();
            info!("ScanScheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.read().await.is_some()
    }

    /// Run one cycle now, subject to the same concurrency cap as timed ticks.
    /// Returns `false` if the tick was dropped.
    pub fn trigger_now(&self) -> bool {
        trigger(&self.scanner, &self.permits, &self.metrics)
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

fn trigger(scanner: &Arc<Scanner>, permits: &Arc<Semaphore>, metrics: &Arc<Metrics>) -> bool {
    match permits.clone().try_acquire_owned() {
        Ok(permit) => {
            let scanner = scanner.clone();
            tokio::spawn(async move {
                let _permit = permit;
                scanner.run_cycle().await;
            });
            true
        }
        Err(_) => {
            metrics.scan_cycles_skipped_total.inc();
            warn!("ScanScheduler: concurrent cycle limit reached, skipping tick");
            false
        }
    }
}

/// Time until the next tick: the next cron fire time, or the interval
/// shifted by a uniform offset in `[-jitter, +jitter]`. Never below one second.
pub fn next_delay(config: &ScanConfig) -> Duration {
    if let Some(schedule) = &config.cron {
        let now = Utc::now();
        return match schedule.upcoming(Utc).next() {
            Some(next) => (next - now).to_std().unwrap_or(MIN_TICK).max(MIN_TICK),
            None => {
                debug!("ScanScheduler: cron schedule exhausted, waiting a minute");
                Duration::from_secs(60)
            }
        };
    }

    let base = config.interval.as_secs_f64();
    let jitter = config.jitter.as_secs_f64().min(base);
    let offset = if jitter > 0.0 {
        rand::thread_rng().gen_range(-jitter..=jitter)
    } else {
        0.0
    };
    Duration::from_secs_f64((base + offset).max(MIN_TICK.as_secs_f64()))
}
