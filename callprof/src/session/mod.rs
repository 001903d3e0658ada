//! Profiling sessions
//!
//! - `config`: inputs for one run and their defaults
//! - `state`: the lock-guarded data shared by tracer and sampler
//! - `driver`: lifecycle of a run, from sampler start to persisted output

pub mod config;
pub mod driver;
pub mod state;

pub use config::{
    SessionConfig, DEFAULT_FLUSH_INTERVAL, DEFAULT_SAMPLE_INTERVAL, DEFAULT_STATS_FILE,
    DEFAULT_TIMESERIES_FILE,
};
pub use driver::{FailedRun, Session, SessionError, SessionOutput, SessionPhase, TargetFault};
pub use state::{MembershipMode, SessionState, SharedState};
