//! Structured error types for callprof
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors. Raised before any instrumentation starts.
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Target not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("Not a file: {}", .0.display())]
    TargetNotAFile(PathBuf),

    #[error("Sampling interval must be greater than zero")]
    InvalidInterval,

    #[error("Flush interval must be greater than zero")]
    InvalidFlushInterval,

    #[error("Failed to start sampler thread: {0}")]
    SamplerSpawnFailed(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Persistence errors for statistics and time-series artifacts.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
