//! RSI threshold evaluation with optional trend and volatility filters.

use crate::models::indicators::IndicatorSnapshot;
use crate::models::signal::{SignalDecision, SignalType, TrendLabel};
use crate::models::strategy::StrategyConfig;
use crate::signals::filters::{TrendAdjustment, TrendFilter, VolatilityFilter};

pub struct SignalEngine;

impl SignalEngine {
    /// Decide buy/sell/nothing for one snapshot under one strategy.
    ///
    /// Buy when `rsi < effective_low`, sell when `rsi > rsi_high`. The trend
    /// filter (if enabled) shifts `effective_low`; the volatility filter (if
    /// enabled) appends a band-touch qualifier to the reason. Returns `None`
    /// for non-finite inputs or when no threshold is crossed.
    pub fn evaluate(snapshot: &IndicatorSnapshot, strategy: &StrategyConfig) -> Option<SignalDecision> {
        let rsi = snapshot.rsi;
        if !rsi.is_finite() || !snapshot.current_price.is_finite() {
            return None;
        }

        let trend = if strategy.enable_trend_filter {
            TrendFilter::apply(snapshot, strategy.rsi_low)
        } else {
            TrendAdjustment::unchanged(strategy.rsi_low)
        };

        let (signal_type, threshold) = if rsi < trend.effective_low {
            (SignalType::Buy, trend.effective_low)
        } else if rsi > strategy.rsi_high {
            (SignalType::Sell, strategy.rsi_high)
        } else {
            return None;
        };

        let mut reason = format!("RSI {}", signal_type);
        if strategy.enable_volatility_filter {
            if let Some(qualifier) = VolatilityFilter::qualifier(signal_type, snapshot) {
                reason = format!("{} + {}", reason, qualifier);
            }
        }

        let comparison = match signal_type {
            SignalType::Buy => "<",
            SignalType::Sell => ">",
        };
        let mut detail = format!("RSI {:.2} {} {:.2}", rsi, comparison, threshold);
        if trend.label != TrendLabel::NotApplied {
            detail.push_str(&format!(" | trend: {}", trend.label));
        }
        if let Some(note) = &trend.note {
            detail.push_str(&format!(" ({})", note));
        }

        Some(SignalDecision {
            signal_type,
            reason,
            detail,
            rsi,
            price: snapshot.current_price,
            trend_label: trend.label,
            threshold,
        })
    }
}
