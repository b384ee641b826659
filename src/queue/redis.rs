//! Redis list queue: `LPUSH` at the tail, `BRPOP` from the head.

use super::{AlarmQueue, QueueError};
use crate::models::alarm::Alarm;
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

/// Upper bound for a single command, blocking pops included.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BLOCK: Duration = Duration::from_secs(20);
/// Reconnect attempts per call; the caller's own loop covers longer outages.
const CONNECT_RETRIES: usize = 1;

/// Whole seconds for `BRPOP`. Servers before 6.0 reject fractional timeouts,
/// and 0 would block forever.
fn block_seconds(timeout: Duration) -> u64 {
    timeout.min(MAX_BLOCK).as_secs().max(1)
}

pub struct RedisAlarmQueue {
    client: redis::Client,
    key: String,
    connection: RwLock<Option<ConnectionManager>>,
}

impl RedisAlarmQueue {
    /// Validates the URL only; the connection is opened on first use, so the
    /// queue can be built while Redis is down.
    pub fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            key: key.into(),
            connection: RwLock::new(None),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn connection(&self) -> Result<ConnectionManager, QueueError> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(CONNECT_RETRIES)
            .set_response_timeout(RESPONSE_TIMEOUT);
        let conn = ConnectionManager::new_with_config(self.client.clone(), config).await?;
        debug!(key = %self.key, "AlarmQueue: connected to Redis");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        self.connection.write().await.take();
    }

    async fn try_push(&self, alarm: &Alarm) -> Result<i64, QueueError> {
        let payload = serde_json::to_string(alarm)?;
        let mut conn = self.connection().await?;
        let len = redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(len)
    }

    async fn try_pop(&self, timeout: Duration) -> Result<Option<Alarm>, QueueError> {
        let mut conn = self.connection().await?;
        let popped = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(block_seconds(timeout))
            .query_async::<Option<(String, String)>>(&mut conn)
            .await?;
        match popped {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AlarmQueue for RedisAlarmQueue {
    async fn push(&self, alarm: &Alarm) -> bool {
        match self.try_push(alarm).await {
            Ok(len) => {
                debug!(
                    key = %self.key,
                    code = %alarm.instrument_code,
                    queue_len = len,
                    "AlarmQueue: pushed alarm for {}",
                    alarm.instrument_code
                );
                true
            }
            Err(e) => {
                error!(
                    key = %self.key,
                    code = %alarm.instrument_code,
                    error = %e,
                    "AlarmQueue: failed to push alarm for {}",
                    alarm.instrument_code
                );
                if matches!(e, QueueError::Unavailable(_)) {
                    self.reset().await;
                }
                false
            }
        }
    }

    async fn pop(&self, timeout: Duration) -> Option<Alarm> {
        match self.try_pop(timeout).await {
            Ok(alarm) => alarm,
            Err(QueueError::Payload(e)) => {
                warn!(key = %self.key, error = %e, "AlarmQueue: dropping undecodable payload");
                None
            }
            Err(e) => {
                error!(key = %self.key, error = %e, "AlarmQueue: pop failed");
                self.reset().await;
                None
            }
        }
    }
}
