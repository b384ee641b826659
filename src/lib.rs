//! tickwatch: watches instruments, evaluates RSI signals on a recurring
//! scan and delivers alerts through a durable queue.

pub mod common;
pub mod config;
pub mod core;
pub mod db;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod queue;
pub mod services;
pub mod signals;
