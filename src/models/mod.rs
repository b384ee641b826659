//! Shared data models spanning the pipeline layers.

pub mod alarm;
pub mod indicators;
pub mod instrument;
pub mod signal;
pub mod strategy;

pub use alarm::{Alarm, NotifyTarget};
pub use indicators::{BollingerBands, Candle, IndicatorSnapshot, MacdValue, Tick};
pub use instrument::{Instrument, InstrumentKind};
pub use signal::{SignalDecision, SignalType, TrendLabel};
pub use strategy::{BarPeriod, StrategyConfig, StrategyError};
