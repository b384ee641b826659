//! Process-local queue with the same FIFO semantics, for tests and
//! single-process runs without Redis.

use super::AlarmQueue;
use crate::models::alarm::Alarm;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

#[derive(Default)]
pub struct MemoryAlarmQueue {
    items: Mutex<VecDeque<Alarm>>,
    available: Notify,
    offline: AtomicBool,
}

impl MemoryAlarmQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Remove and return everything queued, oldest first.
    pub async fn drain(&self) -> Vec<Alarm> {
        self.items.lock().await.drain(..).collect()
    }

    /// Simulate the backing store going away: pushes fail, pops come back empty.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl AlarmQueue for MemoryAlarmQueue {
    async fn push(&self, alarm: &Alarm) -> bool {
        if self.offline.load(Ordering::SeqCst) {
            return false;
        }
        self.items.lock().await.push_back(alarm.clone());
        self.available.notify_one();
        true
    }

    async fn pop(&self, timeout: Duration) -> Option<Alarm> {
        if self.offline.load(Ordering::SeqCst) {
            return None;
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.available.notified();
            if let Some(alarm) = self.items.lock().await.pop_front() {
                return Some(alarm);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.items.lock().await.pop_front();
            }
        }
    }
}
