//! Eastmoney kline endpoint as the upstream market data provider.
//!
//! Bars come from `/api/qt/stock/kline/get`; each row is a comma-separated
//! `date,open,close,high,low,volume,...` string in exchange-local time.

use crate::core::trading_hours;
use crate::models::indicators::{Candle, Tick};
use crate::models::instrument::InstrumentKind;
use crate::models::strategy::BarPeriod;
use crate::services::market_data::{FetchError, MarketDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const KLINE_PATH: &str = "/api/qt/stock/kline/get";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const HISTORY_LIMIT: u32 = 500;
/// 1-minute bars stand in for a real-time quote.
const REALTIME_KLT: &str = "1";

#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(default)]
    rc: i64,
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    klines: Vec<String>,
}

/// Exchange prefix for `secid`: `1` Shanghai, `0` Shenzhen.
pub fn market_prefix(code: &str) -> u8 {
    match code.chars().next() {
        Some('5') | Some('6') | Some('9') => 1,
        _ => 0,
    }
}

fn klt(period: BarPeriod) -> &'static str {
    match period {
        BarPeriod::Daily => "101",
        BarPeriod::Weekly => "102",
        BarPeriod::Monthly => "103",
        BarPeriod::Minutes60 => "60",
        BarPeriod::Minutes30 => "30",
    }
}

fn parse_bar_time(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(15, 0, 0))
        })?;
    trading_hours::exchange_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

/// Parse one kline row; rows with missing or non-numeric fields are dropped.
pub fn parse_kline_row(row: &str) -> Option<Candle> {
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() < 6 {
        return None;
    }
    let num = |i: usize| fields[i].trim().parse::<f64>().ok();
    Some(Candle::new(
        num(1)?,
        num(3)?,
        num(4)?,
        num(2)?,
        num(5).unwrap_or(0.0),
        parse_bar_time(fields[0].trim())?,
    ))
}

pub struct EastmoneyProvider {
    client: reqwest::Client,
    base_url: String,
}

impl EastmoneyProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Terminal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_klines(&self, secid: &str, klt: &str, limit: u32) -> Result<Option<KlineData>, FetchError> {
        let url = format!("{}{}", self.base_url, KLINE_PATH);
        let limit = limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("secid", secid),
                ("fields1", "f1,f2,f3,f4,f5,f6"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
                ("klt", klt),
                ("fqt", "1"),
                ("beg", "0"),
                ("end", "20500101"),
                ("lmt", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status, "kline endpoint"));
        }

        let body: KlineResponse = response.json().await?;
        if body.rc != 0 {
            return Err(FetchError::Terminal(format!(
                "kline endpoint returned rc={} for {}",
                body.rc, secid
            )));
        }
        Ok(body.data)
    }

    async fn history_on(&self, market: u8, code: &str, period: BarPeriod) -> Result<Vec<Candle>, FetchError> {
        let secid = format!("{}.{}", market, code);
        let data = self.fetch_klines(&secid, klt(period), HISTORY_LIMIT).await?;
        let candles: Vec<Candle> = data
            .map(|d| d.klines.iter().filter_map(|row| parse_kline_row(row)).collect())
            .unwrap_or_default();
        debug!(
            secid = %secid,
            period = %period,
            count = candles.len(),
            "EastmoneyProvider: fetched {} bars for {}",
            candles.len(),
            secid
        );
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataProvider for EastmoneyProvider {
    async fn history(
        &self,
        code: &str,
        period: BarPeriod,
        kind: InstrumentKind,
    ) -> Result<Vec<Candle>, FetchError> {
        let market = market_prefix(code);
        match kind {
            InstrumentKind::Equity => self.history_on(market, code, period).await,
            InstrumentKind::Fund => {
                // Fund codes are not always listed where the prefix suggests;
                // an empty or failed lookup retries on the other exchange.
                let primary = self.history_on(market, code, period).await;
                match primary {
                    Ok(candles) if !candles.is_empty() => Ok(candles),
                    Err(e) if e.is_transient() => Err(e),
                    other => {
                        if let Err(ref e) = other {
                            warn!(code = %code, error = %e, "EastmoneyProvider: fund lookup failed for {}, trying other exchange", code);
                        }
                        self.history_on(1 - market, code, period).await
                    }
                }
            }
        }
    }

    async fn realtime(&self, code: &str, _kind: InstrumentKind) -> Result<Option<Tick>, FetchError> {
        let secid = format!("{}.{}", market_prefix(code), code);
        let Some(data) = self.fetch_klines(&secid, REALTIME_KLT, 1).await? else {
            return Ok(None);
        };
        let Some(bar) = data.klines.last().and_then(|row| parse_kline_row(row)) else {
            return Ok(None);
        };
        Ok(Some(Tick {
            code: if data.code.is_empty() { code.to_string() } else { data.code },
            name: if data.name.is_empty() { code.to_string() } else { data.name },
            price: bar.close,
            timestamp: bar.timestamp,
        }))
    }
}
