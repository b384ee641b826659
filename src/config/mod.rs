//! Environment-driven configuration.
//!
//! Values come from the process environment (optionally seeded from `.env`
//! by the binaries via `dotenvy`). Unparseable numbers fall back to defaults.

use cron::Schedule;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MARKET_DATA_URL: &str = "https://push2his.eastmoney.com";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_QUEUE_KEY: &str = "alarm_queue";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Deployment environment name (`ENVIRONMENT`, default `development`).
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

pub fn get_redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string())
}

/// Postgres connection string for the instrument/notify tables, if configured.
pub fn get_database_url() -> Option<String> {
    env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> String {
    env::var(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Scan scheduling and pacing.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub interval: Duration,
    pub jitter: Duration,
    pub cron: Option<Schedule>,
    pub max_concurrent_cycles: usize,
    pub instrument_delay_min: Duration,
    pub instrument_delay_max: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            jitter: Duration::from_secs(30),
            cron: None,
            max_concurrent_cycles: 3,
            instrument_delay_min: Duration::from_millis(1000),
            instrument_delay_max: Duration::from_millis(3000),
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cron = match env::var("SCAN_CRON").ok().filter(|s| !s.trim().is_empty()) {
            Some(expr) => Some(Schedule::from_str(expr.trim()).map_err(|e| {
                ConfigError::InvalidCron {
                    expr: expr.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let interval_secs = env_parse("SCAN_INTERVAL_SECONDS", defaults.interval.as_secs());
        if interval_secs == 0 && cron.is_none() {
            return Err(ConfigError::Invalid {
                key: "SCAN_INTERVAL_SECONDS",
                reason: "must be > 0 when SCAN_CRON is not set".to_string(),
            });
        }

        let delay_min = env_parse(
            "SCAN_INSTRUMENT_DELAY_MIN_MS",
            defaults.instrument_delay_min.as_millis() as u64,
        );
        let delay_max = env_parse(
            "SCAN_INSTRUMENT_DELAY_MAX_MS",
            defaults.instrument_delay_max.as_millis() as u64,
        )
        .max(delay_min);

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            jitter: Duration::from_secs(env_parse("SCAN_JITTER_SECONDS", defaults.jitter.as_secs())),
            cron,
            max_concurrent_cycles: env_parse("SCAN_MAX_CONCURRENT", defaults.max_concurrent_cycles)
                .max(1),
            instrument_delay_min: Duration::from_millis(delay_min),
            instrument_delay_max: Duration::from_millis(delay_max),
        })
    }
}

/// Upstream fetch retry budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(3),
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("FETCH_MAX_RETRIES", defaults.max_retries),
            base_delay: Duration::from_secs(env_parse(
                "FETCH_BASE_DELAY_SECONDS",
                defaults.base_delay.as_secs(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub pop_timeout: Duration,
    pub idle_sleep: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pop_timeout: Duration::from_secs(1),
            idle_sleep: Duration::from_millis(500),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            pop_timeout: Duration::from_secs(
                env_parse("WORKER_POP_TIMEOUT_SECONDS", defaults.pop_timeout.as_secs()).max(1),
            ),
            idle_sleep: Duration::from_millis(env_parse(
                "WORKER_IDLE_SLEEP_MS",
                defaults.idle_sleep.as_millis() as u64,
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl SmtpConfig {
    /// `None` unless both host and user are set.
    pub fn from_env() -> Option<Self> {
        let host = env_string("SMTP_HOST");
        let user = env_string("SMTP_USER");
        if host.is_empty() || user.is_empty() {
            return None;
        }
        Some(Self {
            host,
            port: env_parse("SMTP_PORT", 587),
            user,
            password: env_string("SMTP_PASSWORD"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub fallback_chat_id: Option<String>,
    pub api_url: String,
}

impl TelegramConfig {
    /// `None` unless a bot token is set.
    pub fn from_env() -> Option<Self> {
        let bot_token = env_string("TELEGRAM_BOT_TOKEN");
        if bot_token.is_empty() {
            return None;
        }
        let chat_id = env_string("TELEGRAM_CHAT_ID");
        let api_url = env_string("TELEGRAM_API_URL");
        Some(Self {
            bot_token,
            fallback_chat_id: (!chat_id.is_empty()).then_some(chat_id),
            api_url: if api_url.is_empty() {
                DEFAULT_TELEGRAM_API_URL.to_string()
            } else {
                api_url
            },
        })
    }
}

/// Everything the binaries need, read once at boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub port: u16,
    pub redis_url: String,
    pub queue_key: String,
    pub database_url: Option<String>,
    pub market_data_url: String,
    pub scan: ScanConfig,
    pub retry: RetryConfig,
    pub worker: WorkerConfig,
    pub smtp: Option<SmtpConfig>,
    pub telegram: Option<TelegramConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let queue_key = env_string("ALARM_QUEUE_KEY");
        let market_data_url = env_string("MARKET_DATA_URL");
        Ok(Self {
            environment: get_environment(),
            port: env_parse("PORT", 8080),
            redis_url: get_redis_url(),
            queue_key: if queue_key.is_empty() {
                DEFAULT_QUEUE_KEY.to_string()
            } else {
                queue_key
            },
            database_url: get_database_url(),
            market_data_url: if market_data_url.is_empty() {
                DEFAULT_MARKET_DATA_URL.to_string()
            } else {
                market_data_url
            },
            scan: ScanConfig::from_env()?,
            retry: RetryConfig::from_env(),
            worker: WorkerConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            telegram: TelegramConfig::from_env(),
        })
    }
}
