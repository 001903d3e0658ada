//! Analysis logic for profiling data
//!
//! This module contains the pure post-run reduction of session state into
//! per-function statistics, separated from persistence and display.

pub mod aggregator;

pub use aggregator::{aggregate, FunctionStats, StatsReport};
