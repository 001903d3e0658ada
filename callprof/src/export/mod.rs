//! Result persistence and display
//!
//! This module writes the two session artifacts and renders them for humans:
//! - `timeseries`: per-second resource log, rewritten on every sampler flush
//! - `stats`: final per-function statistics, written once per session
//! - `report`: tabular text report of both

pub mod report;
pub mod stats;
pub mod timeseries;

pub use report::render_report;
pub use stats::{load_stats, sorted_rows, write_stats};
pub use timeseries::{load_timeseries, PerSecondLogEntry, TimeSeriesWriter};
