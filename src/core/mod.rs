//! Core application primitives: clock, orchestration and process surfaces.

pub mod context;
pub mod http;
pub mod scanner;
pub mod scheduler;
pub mod trading_hours;
pub mod worker;

pub use context::{AppContext, BoxError};
pub use scanner::{CycleReport, InstrumentOutcome, ScanError, Scanner};
pub use scheduler::ScanScheduler;
pub use worker::{DeliveryReport, Worker};
