//! Prometheus metrics for the scan pipeline, the worker and the HTTP surface.

use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,

    pub http_requests_total: Counter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: Gauge,

    pub scan_cycles_total: Counter,
    pub scan_cycles_skipped_total: Counter,
    pub scan_cycle_duration_seconds: Histogram,
    pub scan_cycles_active: Gauge,
    pub instruments_scanned_total: Counter,
    pub instrument_failures_total: Counter,
    pub signals_fired_total: Counter,
    pub alarms_suppressed_total: Counter,
    pub alarms_pushed_total: Counter,
    pub alarm_push_failures_total: Counter,
    pub fetch_retries_total: Counter,

    pub notifications_sent_total: Counter,
    pub notification_failures_total: Counter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<Counter> {
    let c = Counter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<Gauge> {
    let g = Gauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn histogram(
    registry: &Registry,
    name: &str,
    help: &str,
    buckets: Vec<f64>,
) -> prometheus::Result<Histogram> {
    let h = Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets))?;
    registry.register(Box::new(h.clone()))?;
    Ok(h)
}

impl Metrics {
    /// Each instance owns its own registry, so tests can build as many as they like.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        Ok(Self {
            http_requests_total: counter(&registry, "http_requests_total", "Total HTTP requests")?,
            http_request_duration_seconds: histogram(
                &registry,
                "http_request_duration_seconds",
                "HTTP request latency",
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
            )?,
            http_requests_in_flight: gauge(
                &registry,
                "http_requests_in_flight",
                "HTTP requests currently being served",
            )?,

            scan_cycles_total: counter(&registry, "scan_cycles_total", "Scan cycles started")?,
            scan_cycles_skipped_total: counter(
                &registry,
                "scan_cycles_skipped_total",
                "Scheduler ticks dropped because the concurrency limit was reached",
            )?,
            scan_cycle_duration_seconds: histogram(
                &registry,
                "scan_cycle_duration_seconds",
                "Wall time of one scan cycle",
                vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0],
            )?,
            scan_cycles_active: gauge(&registry, "scan_cycles_active", "Scan cycles in progress")?,
            instruments_scanned_total: counter(
                &registry,
                "instruments_scanned_total",
                "Instruments evaluated",
            )?,
            instrument_failures_total: counter(
                &registry,
                "instrument_failures_total",
                "Instruments skipped because of fetch, indicator or store failures",
            )?,
            signals_fired_total: counter(&registry, "signals_fired_total", "Signals fired")?,
            alarms_suppressed_total: counter(
                &registry,
                "alarms_suppressed_total",
                "Signals suppressed by cooldown",
            )?,
            alarms_pushed_total: counter(&registry, "alarms_pushed_total", "Alarms enqueued")?,
            alarm_push_failures_total: counter(
                &registry,
                "alarm_push_failures_total",
                "Alarms dropped because the queue was unreachable",
            )?,
            fetch_retries_total: counter(
                &registry,
                "fetch_retries_total",
                "Retries of transient upstream failures",
            )?,

            notifications_sent_total: counter(
                &registry,
                "notifications_sent_total",
                "Notifications delivered",
            )?,
            notification_failures_total: counter(
                &registry,
                "notification_failures_total",
                "Notification deliveries that failed",
            )?,

            registry,
        })
    }

    /// Prometheus text exposition of every registered metric.
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
