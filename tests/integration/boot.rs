//! Process boot: configuration into a wired context, with errors
//! propagated the way the binaries' `main` propagates them.

use std::sync::Arc;
use tickwatch::config::{AppConfig, ConfigError, RetryConfig, ScanConfig, WorkerConfig};
use tickwatch::core::{AppContext, BoxError};
use tokio_test::{assert_err, assert_ok};

fn offline_config() -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        port: 0,
        redis_url: "redis://127.0.0.1:1/".to_string(),
        queue_key: "alarm_queue".to_string(),
        database_url: None,
        market_data_url: "http://127.0.0.1:1".to_string(),
        scan: ScanConfig::default(),
        retry: RetryConfig::default(),
        worker: WorkerConfig::default(),
        smtp: None,
        telegram: None,
    }
}

/// Same shape as the binaries' startup: every fallible step uses `?`
/// into the error type `main` returns.
async fn boot(config: &AppConfig) -> Result<Arc<AppContext>, BoxError> {
    Ok(Arc::new(AppContext::from_config(config).await?))
}

fn load(result: Result<AppConfig, ConfigError>) -> Result<AppConfig, BoxError> {
    Ok(result?)
}

#[tokio::test]
async fn offline_config_boots_with_memory_stores() {
    let ctx = assert_ok!(boot(&offline_config()).await);

    assert!(ctx.instruments.list().await.unwrap().is_empty());
    assert!(ctx.telegram_fallback_chat_id.is_none());
    assert_eq!(ctx.scan.max_concurrent_cycles, 3);
}

#[tokio::test]
async fn unreachable_database_fails_boot() {
    let mut config = offline_config();
    config.database_url =
        Some("host=127.0.0.1 port=1 user=tickwatch dbname=tickwatch connect_timeout=1".to_string());

    let err = assert_err!(boot(&config).await);
    assert!(err.to_string().contains("connect"), "got {}", err);
}

#[tokio::test]
async fn malformed_redis_url_fails_boot() {
    let mut config = offline_config();
    config.redis_url = "not-a-url".to_string();

    assert_err!(boot(&config).await);
}

#[test]
fn config_errors_propagate_to_main() {
    let err = assert_err!(load(Err(ConfigError::Invalid {
        key: "PORT",
        reason: "not a number".to_string(),
    })));
    assert!(err.to_string().contains("PORT"));
}
