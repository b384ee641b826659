//! A-share trading calendar and session clock.
//!
//! Every function is a pure function of the timestamp it is given, which
//! must already be in exchange-local time (China Standard Time, UTC+08:00,
//! no DST). Use [`to_exchange_time`] / [`exchange_now`] to get there.
//!
//! Public holidays are not modeled: any Monday to Friday counts as a
//! trading day.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EXCHANGE_UTC_OFFSET_SECS: i32 = 8 * 3600;

const CALL_AUCTION_START: (u32, u32) = (9, 15);
const CALL_AUCTION_END: (u32, u32) = (9, 25);
const MORNING_START: (u32, u32) = (9, 30);
const MORNING_END: (u32, u32) = (11, 30);
const AFTERNOON_START: (u32, u32) = (13, 0);
const AFTERNOON_END: (u32, u32) = (15, 0);

pub fn exchange_offset() -> FixedOffset {
    FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_SECS).unwrap_or(Utc.fix())
}

pub fn to_exchange_time(t: DateTime<Utc>) -> DateTime<FixedOffset> {
    t.with_timezone(&exchange_offset())
}

pub fn exchange_now() -> DateTime<FixedOffset> {
    to_exchange_time(Utc::now())
}

/// Session phase at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    CallAuction,
    MorningSession,
    AfternoonSession,
    LunchBreak,
    BeforeMarket,
    AfterMarket,
    WeekendSaturday,
    WeekendSunday,
    Closed,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::CallAuction => "call_auction",
            MarketStatus::MorningSession => "morning_session",
            MarketStatus::AfternoonSession => "afternoon_session",
            MarketStatus::LunchBreak => "lunch_break",
            MarketStatus::BeforeMarket => "before_market",
            MarketStatus::AfterMarket => "after_market",
            MarketStatus::WeekendSaturday => "weekend_saturday",
            MarketStatus::WeekendSunday => "weekend_sunday",
            MarketStatus::Closed => "closed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MarketStatus::CallAuction => "Call auction",
            MarketStatus::MorningSession => "Morning session",
            MarketStatus::AfternoonSession => "Afternoon session",
            MarketStatus::LunchBreak => "Lunch break",
            MarketStatus::BeforeMarket => "Pre-market",
            MarketStatus::AfterMarket => "After hours",
            MarketStatus::WeekendSaturday => "Closed (Saturday)",
            MarketStatus::WeekendSunday => "Closed (Sunday)",
            MarketStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full clock reading, served by the market status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingStatus {
    pub datetime: String,
    pub is_trading_day: bool,
    pub is_trading_time: bool,
    pub is_call_auction: bool,
    pub status: MarketStatus,
    pub description: String,
    pub weekday: String,
    pub time: String,
}

fn at(hm: (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hm.0, hm.1, 0).unwrap_or(NaiveTime::MIN)
}

fn time_of_day<T: Timelike>(t: &T) -> NaiveTime {
    NaiveTime::from_hms_nano_opt(t.hour(), t.minute(), t.second(), t.nanosecond())
        .unwrap_or(NaiveTime::MIN)
}

fn within(t: NaiveTime, start: (u32, u32), end: (u32, u32)) -> bool {
    at(start) <= t && t <= at(end)
}

/// Monday to Friday.
pub fn is_trading_day<T: Datelike>(t: &T) -> bool {
    !matches!(t.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Inside 09:30–11:30 or 13:00–15:00 (closed intervals) on a trading day,
/// plus 09:15–09:25 when `include_call_auction`.
pub fn is_trading_time<T: Datelike + Timelike>(t: &T, include_call_auction: bool) -> bool {
    if !is_trading_day(t) {
        return false;
    }
    let tod = time_of_day(t);
    within(tod, MORNING_START, MORNING_END)
        || within(tod, AFTERNOON_START, AFTERNOON_END)
        || (include_call_auction && within(tod, CALL_AUCTION_START, CALL_AUCTION_END))
}

pub fn is_call_auction<T: Datelike + Timelike>(t: &T) -> bool {
    is_trading_day(t) && within(time_of_day(t), CALL_AUCTION_START, CALL_AUCTION_END)
}

pub fn is_market_open<T: Datelike + Timelike>(t: &T) -> bool {
    is_trading_time(t, false)
}

/// Real-time quotes are only worth requesting while orders can match.
pub fn should_use_realtime_api<T: Datelike + Timelike>(t: &T) -> bool {
    is_trading_time(t, true)
}

pub fn status<T: Datelike + Timelike>(t: &T) -> MarketStatus {
    match t.weekday() {
        Weekday::Sat => return MarketStatus::WeekendSaturday,
        Weekday::Sun => return MarketStatus::WeekendSunday,
        _ => {}
    }

    let tod = time_of_day(t);
    if within(tod, CALL_AUCTION_START, CALL_AUCTION_END) {
        MarketStatus::CallAuction
    } else if within(tod, MORNING_START, MORNING_END) {
        MarketStatus::MorningSession
    } else if within(tod, AFTERNOON_START, AFTERNOON_END) {
        MarketStatus::AfternoonSession
    } else if tod < at(CALL_AUCTION_START) {
        MarketStatus::BeforeMarket
    } else if at(MORNING_END) < tod && tod < at(AFTERNOON_START) {
        MarketStatus::LunchBreak
    } else if tod > at(AFTERNOON_END) {
        MarketStatus::AfterMarket
    } else {
        // 09:25–09:30 gap between auction and continuous trading
        MarketStatus::Closed
    }
}

pub fn trading_status(t: &DateTime<FixedOffset>) -> TradingStatus {
    let status = status(t);
    TradingStatus {
        datetime: t.to_rfc3339(),
        is_trading_day: is_trading_day(t),
        is_trading_time: is_trading_time(t, false),
        is_call_auction: is_call_auction(t),
        status,
        description: status.description().to_string(),
        weekday: t.format("%A").to_string(),
        time: t.format("%H:%M:%S").to_string(),
    }
}
