//! Signal evaluation: base RSI rule plus composable filters.

pub mod engine;
pub mod filters;

pub use engine::SignalEngine;
pub use filters::{TrendAdjustment, TrendFilter, VolatilityFilter, LOWER_BAND_TOUCH, UPPER_BAND_TOUCH};
