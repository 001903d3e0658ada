//! Session configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::state::MembershipMode;

/// Default sampler tick interval.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Default interval between time-series flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Conventional file name for the incrementally written time series.
pub const DEFAULT_TIMESERIES_FILE: &str = "realtime_monitor.json";

/// Conventional file name for the final per-function statistics.
pub const DEFAULT_STATS_FILE: &str = "function_statistics.json";

/// Inputs for one profiling session.
///
/// Output paths are optional; without them results are only returned in
/// memory.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target: PathBuf,
    pub sample_interval: Duration,
    pub flush_interval: Duration,
    pub timeseries_output: Option<PathBuf>,
    pub stats_output: Option<PathBuf>,
    pub membership: MembershipMode,
}

impl SessionConfig {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            timeseries_output: None,
            stats_output: None,
            membership: MembershipMode::default(),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use]
    pub fn with_timeseries_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.timeseries_output = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_stats_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.stats_output = Some(path.into());
        self
    }

    /// Write both artifacts into `dir` under their conventional file names.
    #[must_use]
    pub fn with_output_dir(self, dir: &Path) -> Self {
        self.with_timeseries_output(dir.join(DEFAULT_TIMESERIES_FILE))
            .with_stats_output(dir.join(DEFAULT_STATS_FILE))
    }

    #[must_use]
    pub fn with_membership(mut self, membership: MembershipMode) -> Self {
        self.membership = membership;
        self
    }
}
