//! In-process stores, used by tests and when no database is configured.

use super::{InstrumentStore, NotifyTargetStore, StoreError};
use crate::models::alarm::NotifyTarget;
use crate::models::instrument::Instrument;
use crate::models::strategy::StrategyConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryInstrumentStore {
    instruments: RwLock<Vec<Instrument>>,
    strategies: RwLock<HashMap<String, StrategyConfig>>,
    defaults_created: AtomicUsize,
}

impl MemoryInstrumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instruments(instruments: Vec<Instrument>) -> Self {
        Self {
            instruments: RwLock::new(instruments),
            ..Self::default()
        }
    }

    pub async fn add_instrument(&self, instrument: Instrument) {
        self.instruments.write().await.push(instrument);
    }

    pub async fn set_strategy(&self, strategy: StrategyConfig) {
        self.strategies
            .write()
            .await
            .insert(strategy.instrument_code.clone(), strategy);
    }

    pub async fn strategy(&self, code: &str) -> Option<StrategyConfig> {
        self.strategies.read().await.get(code).cloned()
    }

    /// How many default strategies have been created so far.
    pub fn defaults_created(&self) -> usize {
        self.defaults_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstrumentStore for MemoryInstrumentStore {
    async fn list(&self) -> Result<Vec<Instrument>, StoreError> {
        Ok(self.instruments.read().await.clone())
    }

    async fn get_strategy(&self, code: &str) -> Result<Option<StrategyConfig>, StoreError> {
        Ok(self.strategy(code).await)
    }

    async fn create_default_strategy(&self, code: &str) -> Result<StrategyConfig, StoreError> {
        let mut strategies = self.strategies.write().await;
        let strategy = strategies
            .entry(code.to_string())
            .or_insert_with(|| {
                self.defaults_created.fetch_add(1, Ordering::SeqCst);
                StrategyConfig::default_for(code)
            })
            .clone();
        Ok(strategy)
    }

    async fn update_last_notify(&self, code: &str, time: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(strategy) = self.strategies.write().await.get_mut(code) {
            strategy.last_notify_time = Some(time);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotifyTargetStore {
    targets: RwLock<HashMap<i64, NotifyTarget>>,
}

impl MemoryNotifyTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, target: NotifyTarget) {
        self.targets.write().await.insert(target.user_id, target);
    }
}

#[async_trait]
impl NotifyTargetStore for MemoryNotifyTargetStore {
    async fn get(&self, user_id: i64) -> Result<Option<NotifyTarget>, StoreError> {
        Ok(self.targets.read().await.get(&user_id).cloned())
    }
}
