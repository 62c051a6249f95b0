//! Synthetic break fixtures, detector backtests and a plain-text report.

pub mod backtester;
pub mod data_generator;
pub mod metrics;
pub mod reporter;
