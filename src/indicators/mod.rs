//! Technical indicators over closing-price series.
//!
//! The scanner depends only on the [`IndicatorLibrary`] trait; the
//! calculators in the submodules back the default [`StandardIndicators`].

pub mod error;
pub mod library;
pub mod momentum;
pub mod snapshot;
pub mod trend;
pub mod volatility;

pub use error::IndicatorError;
pub use library::{IndicatorLibrary, StandardIndicators};
pub use snapshot::{compute_snapshot, BOLLINGER_LENGTH, BOLLINGER_STD_DEV, TREND_MA_LENGTH};
