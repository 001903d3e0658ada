//! Per-second resource time series.
//!
//! The sampler rewrites the whole series on every flush, so the file on disk
//! is always a complete JSON array even if the process dies mid-run.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::ExportError;

/// One flushed interval of the time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerSecondLogEntry {
    /// Local wall-clock time, `HH:MM:SS`.
    pub timestamp: String,
    pub cpu: f64,
    pub mem: f64,
    /// Sorted `file:function:line` keys active during the interval.
    pub active_functions: Vec<String>,
}

/// Writes the growing time series to a fixed path.
#[derive(Debug, Clone)]
pub struct TimeSeriesWriter {
    path: PathBuf,
}

impl TimeSeriesWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with `entries`.
    ///
    /// # Errors
    /// Returns [`ExportError::WriteFailed`] if the file cannot be created or
    /// written.
    pub fn write(&self, entries: &[PerSecondLogEntry]) -> Result<(), ExportError> {
        let write_failed = |source| ExportError::WriteFailed { path: self.path.clone(), source };

        let file = File::create(&self.path).map_err(write_failed)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.flush().map_err(write_failed)?;
        Ok(())
    }
}

/// Load a persisted time series.
///
/// # Errors
/// Fails if the file cannot be read or is not a time-series array.
pub fn load_timeseries(path: &Path) -> Result<Vec<PerSecondLogEntry>, ExportError> {
    let file = File::open(path)
        .map_err(|source| ExportError::ReadFailed { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
