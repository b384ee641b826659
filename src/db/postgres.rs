//! Postgres-backed stores over the `user_stocks`, `user_strategies` and
//! `user_notifies` tables. The schema is owned by the management API.

use super::{InstrumentStore, NotifyTargetStore, StoreError};
use crate::models::alarm::NotifyTarget;
use crate::models::instrument::{Instrument, InstrumentKind};
use crate::models::strategy::{BarPeriod, StrategyConfig};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, warn};

const STRATEGY_COLUMNS: &str = "stock_code, rsi_low::FLOAT8, rsi_high::FLOAT8, rsi_period, \
     rsi_length::INT4, enable_push, enable_trend_filter, enable_volatility_filter, \
     cooldown_period::INT4, last_notify_time";

pub struct PostgresStore {
    database_url: String,
    client: RwLock<Option<Arc<Client>>>,
}

impl PostgresStore {
    /// Store that opens its connection on first use.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            client: RwLock::new(None),
        }
    }

    /// Store with the connection opened up front, so a bad URL fails at boot.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let store = Self::new(database_url);
        store.client().await?;
        Ok(store)
    }

    /// Live client, reconnecting when the previous connection has closed.
    /// A failed attempt leaves the slot empty so the next call tries again.
    async fn client(&self) -> Result<Arc<Client>, StoreError> {
        if let Some(c) = self.client.read().await.as_ref() {
            if !c.is_closed() {
                return Ok(c.clone());
            }
        }

        let mut slot = self.client.write().await;
        if let Some(c) = slot.as_ref() {
            if !c.is_closed() {
                return Ok(c.clone());
            }
            warn!("PostgresStore: connection closed, reconnecting");
            *slot = None;
        }

        let (client, connection) = tokio_postgres::connect(&self.database_url, NoTls)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgresStore: connection error");
            }
        });

        let client = Arc::new(client);
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>, StoreError> {
        let client = self.client().await?;
        Ok(client.query(sql, params).await?)
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64, StoreError> {
        let client = self.client().await?;
        Ok(client.execute(sql, params).await?)
    }
}

fn strategy_from_row(row: &Row) -> Result<StrategyConfig, StoreError> {
    let code: String = row.try_get(0)?;
    let period: Option<String> = row.try_get(3)?;
    let period = period.as_deref().unwrap_or("daily");
    let rsi_period = BarPeriod::parse(period).unwrap_or_else(|| {
        warn!(code = %code, period = %period, "PostgresStore: unsupported rsi_period for {}, using daily", code);
        BarPeriod::Daily
    });

    let rsi_length: i32 = row.try_get(4)?;
    let cooldown: Option<i32> = row.try_get(8)?;
    let last_notify: Option<NaiveDateTime> = row.try_get(9)?;

    Ok(StrategyConfig {
        rsi_low: row.try_get(1)?,
        rsi_high: row.try_get(2)?,
        rsi_period,
        rsi_length: u32::try_from(rsi_length)
            .map_err(|_| StoreError::InvalidRow(format!("negative rsi_length for {}", code)))?,
        enable_push: row.try_get::<_, Option<bool>>(5)?.unwrap_or(true),
        enable_trend_filter: row.try_get::<_, Option<bool>>(6)?.unwrap_or(false),
        enable_volatility_filter: row.try_get::<_, Option<bool>>(7)?.unwrap_or(false),
        cooldown_period_minutes: cooldown
            .map(|c| c.max(0) as u32)
            .unwrap_or(StrategyConfig::DEFAULT_COOLDOWN_MINUTES),
        last_notify_time: last_notify.map(|t| DateTime::from_naive_utc_and_offset(t, Utc)),
        instrument_code: code,
    })
}

#[async_trait]
impl InstrumentStore for PostgresStore {
    async fn list(&self) -> Result<Vec<Instrument>, StoreError> {
        let rows = self
            .query(
                "SELECT stock_code, stock_name, stock_type, user_id::INT8 FROM user_stocks ORDER BY id",
                &[],
            )
            .await?;

        let mut instruments = Vec::with_capacity(rows.len());
        for row in rows {
            let code: String = row.try_get(0)?;
            let name: Option<String> = row.try_get(1)?;
            let kind: Option<String> = row.try_get(2)?;
            let user_id: Option<i64> = row.try_get(3)?;
            let kind = kind
                .as_deref()
                .and_then(InstrumentKind::parse)
                .unwrap_or_default();
            let instrument = Instrument::new(code.clone(), name.unwrap_or(code), kind);
            instruments.push(match user_id {
                Some(id) => instrument.with_user(id),
                None => instrument,
            });
        }
        Ok(instruments)
    }

    async fn get_strategy(&self, code: &str) -> Result<Option<StrategyConfig>, StoreError> {
        let sql = format!(
            "SELECT {} FROM user_strategies WHERE stock_code = $1 ORDER BY id LIMIT 1",
            STRATEGY_COLUMNS
        );
        let rows = self.query(&sql, &[&code]).await?;
        rows.first().map(strategy_from_row).transpose()
    }

    async fn create_default_strategy(&self, code: &str) -> Result<StrategyConfig, StoreError> {
        let strategy = StrategyConfig::default_for(code);
        let rsi_length = strategy.rsi_length as i32;
        let cooldown = strategy.cooldown_period_minutes as i32;
        self.execute(
            "INSERT INTO user_strategies (user_id, stock_code, rsi_low, rsi_high, rsi_period, rsi_length, \
             enable_push, enable_trend_filter, enable_volatility_filter, cooldown_period)
             VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9)",
            &[
                &code,
                &strategy.rsi_low,
                &strategy.rsi_high,
                &strategy.rsi_period.as_str(),
                &rsi_length,
                &strategy.enable_push,
                &strategy.enable_trend_filter,
                &strategy.enable_volatility_filter,
                &cooldown,
            ],
        )
        .await?;
        Ok(strategy)
    }

    async fn update_last_notify(&self, code: &str, time: DateTime<Utc>) -> Result<(), StoreError> {
        let naive = time.naive_utc();
        self.execute(
            "UPDATE user_strategies SET last_notify_time = $1 WHERE stock_code = $2",
            &[&naive, &code],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NotifyTargetStore for PostgresStore {
    async fn get(&self, user_id: i64) -> Result<Option<NotifyTarget>, StoreError> {
        let rows = self
            .query(
                "SELECT telegram_id, email FROM user_notifies WHERE user_id::INT8 = $1 ORDER BY id LIMIT 1",
                &[&user_id],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Some(NotifyTarget {
            user_id,
            telegram_id: non_empty(row.try_get(0)?),
            email: non_empty(row.try_get(1)?),
        }))
    }
}
