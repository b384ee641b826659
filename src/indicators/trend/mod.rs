//! Trend indicators: moving averages

pub mod sma;

pub use sma::*;
