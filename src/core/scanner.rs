//! One scan cycle: for every watched instrument fetch history, compute
//! indicators, evaluate the strategy and enqueue an alarm when a signal
//! fires outside its cooldown.
//!
//! Instruments are processed strictly one after another with a randomized
//! pause in between; that pacing is the only rate limit on the upstream.
//! `last_notify_time` is read and written without locking, so two
//! overlapping cycles can both pass the cooldown for the same instrument.

use crate::core::context::AppContext;
use crate::core::trading_hours;
use crate::db::StoreError;
use crate::indicators::{compute_snapshot, IndicatorError};
use crate::models::alarm::Alarm;
use crate::models::instrument::Instrument;
use crate::models::signal::SignalDecision;
use crate::models::strategy::{StrategyConfig, StrategyError};
use crate::services::market_data::FetchError;
use crate::signals::SignalEngine;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why an instrument was skipped for the current cycle.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("history fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("no history returned")]
    NoData,
    #[error("indicators unavailable: {0}")]
    Indicator(#[from] IndicatorError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid strategy: {0}")]
    Strategy(#[from] StrategyError),
}

/// What happened to one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    NoSignal,
    /// Signal fired inside the cooldown window.
    Suppressed,
    /// Signal fired but the strategy has pushes turned off.
    PushDisabled,
    Pushed(Alarm),
    /// Queue unreachable; alarm dropped, `last_notify_time` untouched.
    PushFailed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Cycle abandoned because `now` is not a trading day.
    pub aborted: bool,
    pub scanned: usize,
    pub failed: usize,
    pub signals: usize,
    pub suppressed: usize,
    pub pushed: usize,
}

pub struct Scanner {
    ctx: Arc<AppContext>,
}

impl Scanner {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub async fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if the wall clock read `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        let metrics = &self.ctx.metrics;
        let mut report = CycleReport::default();

        let local = trading_hours::to_exchange_time(now);
        if !trading_hours::is_trading_day(&local) {
            info!(
                status = %trading_hours::status(&local),
                "Scanner: {} is not a trading day, skipping cycle",
                local.format("%Y-%m-%d")
            );
            report.aborted = true;
            return report;
        }

        let instruments = match self.ctx.instruments.list().await {
            Ok(list) => list,
            Err(e) => {
                error!(error = %e, "Scanner: failed to list instruments");
                return report;
            }
        };
        if instruments.is_empty() {
            info!("Scanner: no instruments to monitor");
            return report;
        }

        metrics.scan_cycles_total.inc();
        metrics.scan_cycles_active.inc();
        let started = Instant::now();
        info!(count = instruments.len(), "Scanner: scanning {} instruments", instruments.len());

        for (i, instrument) in instruments.iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }

            report.scanned += 1;
            metrics.instruments_scanned_total.inc();
            match self.scan_instrument(instrument, now).await {
                Ok(InstrumentOutcome::NoSignal) => {}
                Ok(InstrumentOutcome::Suppressed) => {
                    report.signals += 1;
                    report.suppressed += 1;
                }
                Ok(InstrumentOutcome::Pushed(_)) => {
                    report.signals += 1;
                    report.pushed += 1;
                }
                Ok(InstrumentOutcome::PushDisabled) | Ok(InstrumentOutcome::PushFailed) => {
                    report.signals += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    metrics.instrument_failures_total.inc();
                    warn!(
                        code = %instrument.code,
                        error = %e,
                        "Scanner: skipping {} this cycle: {}",
                        instrument.code,
                        e
                    );
                }
            }
        }

        let elapsed = started.elapsed();
        metrics.scan_cycle_duration_seconds.observe(elapsed.as_secs_f64());
        metrics.scan_cycles_active.dec();
        info!(
            scanned = report.scanned,
            failed = report.failed,
            signals = report.signals,
            suppressed = report.suppressed,
            pushed = report.pushed,
            duration_ms = elapsed.as_millis() as u64,
            "Scanner: cycle finished"
        );
        report
    }

    async fn resolve_strategy(&self, code: &str) -> Result<StrategyConfig, ScanError> {
        match self.ctx.instruments.get_strategy(code).await? {
            Some(strategy) => Ok(strategy),
            None => {
                warn!(code = %code, "Scanner: no strategy for {}, creating default", code);
                Ok(self.ctx.instruments.create_default_strategy(code).await?)
            }
        }
    }

    /// Fetch, evaluate and (maybe) enqueue for a single instrument.
    pub async fn scan_instrument(
        &self,
        instrument: &Instrument,
        now: DateTime<Utc>,
    ) -> Result<InstrumentOutcome, ScanError> {
        let code = instrument.code.as_str();
        let strategy = self.resolve_strategy(code).await?;
        strategy.validate()?;

        let candles = self
            .ctx
            .fetcher
            .history(code, strategy.rsi_period, instrument.kind)
            .await?;
        if candles.is_empty() {
            return Err(ScanError::NoData);
        }

        let snapshot = compute_snapshot(self.ctx.indicators.as_ref(), &candles, strategy.rsi_length)?;
        debug!(
            code = %code,
            rsi = snapshot.rsi,
            length = strategy.rsi_length,
            period = %strategy.rsi_period,
            "Scanner: {} RSI {:.2}",
            code,
            snapshot.rsi
        );

        let Some(decision) = SignalEngine::evaluate(&snapshot, &strategy) else {
            return Ok(InstrumentOutcome::NoSignal);
        };
        self.ctx.metrics.signals_fired_total.inc();
        info!(
            code = %code,
            signal = %decision.signal_type,
            rsi = decision.rsi,
            threshold = decision.threshold,
            trend = %decision.trend_label,
            "Scanner: {} fired {} ({})",
            code,
            decision.reason,
            decision.detail
        );

        if strategy.in_cooldown(now) {
            self.ctx.metrics.alarms_suppressed_total.inc();
            info!(
                code = %code,
                last_notify = ?strategy.last_notify_time,
                cooldown_minutes = strategy.cooldown_period_minutes,
                "Scanner: {} in cooldown, alert suppressed",
                code
            );
            return Ok(InstrumentOutcome::Suppressed);
        }

        if !strategy.enable_push {
            debug!(code = %code, "Scanner: push disabled for {}", code);
            return Ok(InstrumentOutcome::PushDisabled);
        }

        let price = self.realtime_price(instrument, now).await;
        let alarm = build_alarm(instrument, &decision, price, now);

        if !self.ctx.queue.push(&alarm).await {
            self.ctx.metrics.alarm_push_failures_total.inc();
            error!(code = %code, "Scanner: alarm for {} dropped, queue unavailable", code);
            return Ok(InstrumentOutcome::PushFailed);
        }
        self.ctx.metrics.alarms_pushed_total.inc();

        if let Err(e) = self.ctx.instruments.update_last_notify(code, now).await {
            // Alarm stays queued; the next cycle may fire again for this instrument.
            error!(code = %code, error = %e, "Scanner: failed to record notify time for {}", code);
        }
        info!(code = %code, reason = %alarm.reason, "Scanner: alarm queued for {}", code);
        Ok(InstrumentOutcome::Pushed(alarm))
    }

    /// Best-effort latest price; 0 when the market is closed or the fetch fails.
    async fn realtime_price(&self, instrument: &Instrument, now: DateTime<Utc>) -> f64 {
        match self.ctx.fetcher.realtime(&instrument.code, instrument.kind, now).await {
            Ok(Some(tick)) if tick.price.is_finite() => tick.price,
            Ok(_) => 0.0,
            Err(e) => {
                warn!(
                    code = %instrument.code,
                    error = %e,
                    "Scanner: real-time price for {} unavailable",
                    instrument.code
                );
                0.0
            }
        }
    }

    async fn pause(&self) {
        let delay = inter_instrument_delay(
            self.ctx.scan.instrument_delay_min,
            self.ctx.scan.instrument_delay_max,
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Uniform random delay in `[min, max]`.
pub fn inter_instrument_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(ms)
}

pub fn build_alarm(
    instrument: &Instrument,
    decision: &SignalDecision,
    price: f64,
    now: DateTime<Utc>,
) -> Alarm {
    Alarm {
        user_id: instrument.user_id,
        instrument_code: instrument.code.clone(),
        instrument_name: instrument.display_name.clone(),
        reason: decision.reason.clone(),
        value: decision.rsi,
        threshold: decision.threshold,
        price,
        timestamp: trading_hours::to_exchange_time(now),
    }
}
