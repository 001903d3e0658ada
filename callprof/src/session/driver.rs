//! # Session Driver
//!
//! Owns one profiling run from start to persisted output.
//!
//! ```text
//!  Idle ──start sampler, install tracer──▶ Running ──target returns/fails──▶ Stopping
//!                                            │                                  │
//!                                            └──────── fault ───▶ Failed ◀──────┤
//!                                                                               ▼
//!                                                   join sampler, aggregate, persist
//!                                                                               │
//!                                                                           Finalized
//! ```
//!
//! Teardown (stop signal + tracer uninstall) is tied to a drop guard, so it
//! runs on every exit path out of the target code. A fault in the target does
//! not lose data: the partial state is still aggregated and persisted, and the
//! fault is returned together with those results.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::config::SessionConfig;
use super::state::{lock_state, SessionState, SharedState};
use crate::analysis::{aggregate, StatsReport};
use crate::domain::ProfilerError;
use crate::export::{write_stats, PerSecondLogEntry, TimeSeriesWriter};
use crate::preflight::Target;
use crate::profiling::resource::{ProcessProbe, ResourceProbe};
use crate::profiling::sampler::{Sampler, SamplerConfig, SamplerHandle};
use crate::profiling::tracer::Tracer;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Stopping,
    Finalized,
    Failed,
}

/// Results of a session, complete or partial.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub stats: StatsReport,
    pub series: Vec<PerSecondLogEntry>,
    /// Sampler ticks taken during the run.
    pub ticks: u64,
    /// Wall-clock time from sampler start to sampler join.
    pub elapsed: Duration,
    /// `Finalized` for a clean run, `Failed` when the target faulted.
    pub phase: SessionPhase,
    /// Artifact writes that failed and were skipped.
    pub persist_failures: usize,
}

/// Why the target code did not complete normally.
pub enum TargetFault<E> {
    /// The target returned an error.
    Error(E),
    /// The target panicked. Holds the original payload.
    Panic(Box<dyn Any + Send + 'static>),
}

impl<E> TargetFault<E> {
    /// Panic message, when the payload is a string.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Self::Error(_) => None,
            Self::Panic(payload) => payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str)),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for TargetFault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Self::Panic(_) => f.debug_tuple("Panic").field(&self.panic_message()).finish(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for TargetFault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Panic(_) => {
                write!(f, "panicked: {}", self.panic_message().unwrap_or("<non-string payload>"))
            }
        }
    }
}

/// A run whose target faulted, with the results collected up to the fault.
#[derive(Debug)]
pub struct FailedRun<E> {
    pub fault: TargetFault<E>,
    pub output: SessionOutput,
}

impl<E> FailedRun<E> {
    /// Re-raise a captured panic on the current thread. Returns the run
    /// unchanged when the fault was an error.
    pub fn resume_panic(self) -> Self {
        match self.fault {
            TargetFault::Panic(payload) => panic::resume_unwind(payload),
            TargetFault::Error(_) => self,
        }
    }
}

/// Errors from [`Session::run`].
#[derive(Debug)]
pub enum SessionError<E> {
    /// The session could not start. Nothing was recorded.
    Profiler(ProfilerError),
    /// The target faulted after the session started.
    Target(Box<FailedRun<E>>),
}

impl<E> From<ProfilerError> for SessionError<E> {
    fn from(err: ProfilerError) -> Self {
        Self::Profiler(err)
    }
}

impl<E: fmt::Display> fmt::Display for SessionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profiler(e) => write!(f, "{e}"),
            Self::Target(run) => write!(f, "Target failed: {}", run.fault),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for SessionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Profiler(e) => Some(e),
            Self::Target(_) => None,
        }
    }
}

/// Signals the sampler and uninstalls the tracer when dropped.
struct Teardown<'a> {
    tracer: &'a Tracer,
    sampler: &'a SamplerHandle,
}

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        self.sampler.signal_stop();
        self.tracer.uninstall();
    }
}

/// One profiling run over a target.
pub struct Session {
    config: SessionConfig,
    target: Arc<Target>,
    state: SharedState,
    probe: Option<Box<dyn ResourceProbe>>,
    phase: SessionPhase,
}

impl Session {
    /// Validate `config` and prepare an idle session.
    ///
    /// # Errors
    /// Returns a [`ProfilerError`] if the target does not exist, is not a
    /// file, or an interval is zero.
    pub fn new(config: SessionConfig) -> Result<Self, ProfilerError> {
        if config.sample_interval.is_zero() {
            return Err(ProfilerError::InvalidInterval);
        }
        if config.flush_interval.is_zero() {
            return Err(ProfilerError::InvalidFlushInterval);
        }
        let target = Arc::new(Target::resolve(&config.target)?);
        let state = SessionState::shared(config.membership);

        Ok(Self { config, target, state, probe: None, phase: SessionPhase::Idle })
    }

    /// Replace the default process probe.
    #[must_use]
    pub fn with_probe(mut self, probe: impl ResourceProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!("session {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Profile `body` on the calling thread.
    ///
    /// `body` receives the session's [`Tracer`] and reports its call
    /// boundaries through it. The sampler runs on a background thread for the
    /// duration of `body`.
    ///
    /// # Errors
    /// [`SessionError::Profiler`] if the sampler cannot be started;
    /// [`SessionError::Target`] if `body` returns an error or panics. In the
    /// latter case the partial results have already been persisted.
    pub fn run<T, E, F>(mut self, body: F) -> Result<(T, SessionOutput), SessionError<E>>
    where
        F: FnOnce(&Tracer) -> Result<T, E>,
    {
        let probe = self.probe.take().unwrap_or_else(|| Box::new(ProcessProbe::current()));
        let sampler = Sampler::new(
            Arc::clone(&self.state),
            self.target.main_identity(),
            probe,
            SamplerConfig {
                interval: self.config.sample_interval,
                flush_interval: self.config.flush_interval,
                output: self.config.timeseries_output.as_ref().map(TimeSeriesWriter::new),
            },
        );
        let tracer = Tracer::new(Arc::clone(&self.target), Arc::clone(&self.state));

        let started = Instant::now();
        let sampler = sampler.spawn()?;
        tracer.install();
        self.transition(SessionPhase::Running);

        let outcome = {
            let _teardown = Teardown { tracer: &tracer, sampler: &sampler };
            tracer.enter_main();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&tracer)));
            tracer.exit_main();
            outcome
        };

        let fault = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TargetFault::Error(e)),
            Err(payload) => Err(TargetFault::Panic(payload)),
        };
        self.transition(SessionPhase::Stopping);

        let sampled = sampler.join();
        let elapsed = started.elapsed();
        let stats = aggregate(&lock_state(&self.state));

        let mut persist_failures = sampled.persist_failures;
        if let Some(path) = &self.config.stats_output {
            if let Err(e) = write_stats(path, &stats) {
                persist_failures += 1;
                warn!("Failed to persist function statistics: {e}");
            }
        }

        self.transition(if fault.is_ok() { SessionPhase::Finalized } else { SessionPhase::Failed });
        info!(
            "session {:?}: {} functions, {} ticks, {} time-series entries in {:.3}s",
            self.phase,
            stats.len(),
            sampled.ticks,
            sampled.series.len(),
            elapsed.as_secs_f64()
        );

        let output = SessionOutput {
            stats,
            series: sampled.series,
            ticks: sampled.ticks,
            elapsed,
            phase: self.phase,
            persist_failures,
        };

        match fault {
            Ok(value) => Ok((value, output)),
            Err(fault) => Err(SessionError::Target(Box::new(FailedRun { fault, output }))),
        }
    }
}
