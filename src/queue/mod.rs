//! Durable FIFO between the scanner and the notification worker.
//!
//! Delivery is at-least-once at best: there is no acknowledgement, so an
//! alarm popped by a worker that then dies is gone.

pub mod memory;
pub mod redis;

use crate::models::alarm::Alarm;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use self::memory::MemoryAlarmQueue;
pub use self::redis::RedisAlarmQueue;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue store unavailable: {0}")]
    Unavailable(#[from] ::redis::RedisError),
    #[error("malformed alarm payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[async_trait]
pub trait AlarmQueue: Send + Sync {
    /// Enqueue at the tail. `false` (never an error) when the store is unreachable.
    async fn push(&self, alarm: &Alarm) -> bool;

    /// Dequeue from the head, waiting up to `timeout`. `None` when empty,
    /// unreachable or the payload cannot be decoded.
    async fn pop(&self, timeout: Duration) -> Option<Alarm>;
}
