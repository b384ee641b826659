//! Instrument, strategy and notify-target storage seams.
//!
//! Rows are created and edited elsewhere; the scanner only reads them,
//! creates missing default strategies and stamps `last_notify_time`.

pub mod memory;
pub mod postgres;

use crate::models::alarm::NotifyTarget;
use crate::models::instrument::Instrument;
use crate::models::strategy::StrategyConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::{MemoryInstrumentStore, MemoryNotifyTargetStore};
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to database: {0}")]
    Connect(String),
    #[error("query failed: {0}")]
    Query(#[from] tokio_postgres::Error),
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

#[async_trait]
pub trait InstrumentStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Instrument>, StoreError>;

    async fn get_strategy(&self, code: &str) -> Result<Option<StrategyConfig>, StoreError>;

    /// Insert the default strategy for `code` and return it.
    async fn create_default_strategy(&self, code: &str) -> Result<StrategyConfig, StoreError>;

    async fn update_last_notify(&self, code: &str, time: DateTime<Utc>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NotifyTargetStore: Send + Sync {
    async fn get(&self, user_id: i64) -> Result<Option<NotifyTarget>, StoreError>;
}
