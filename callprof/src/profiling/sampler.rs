//! # Background Sampler
//!
//! A dedicated thread that periodically reads process CPU and memory and
//! attributes each reading to every function active at that instant.
//!
//! ## Tick cycle
//!
//! ```text
//! ┌──────────┐   ┌─────────────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  probe   │──▶│ lock: snapshot +    │──▶│ tick buffer  │──▶│ wait interval │
//! │  read    │   │ attribute, unlock   │   │ push Sample  │   │ (or stop)     │
//! └──────────┘   └─────────────────────┘   └──────────────┘   └───────┬───────┘
//!                                                                     │
//!                          flush interval elapsed? ──▶ PerSecondLogEntry + persist
//! ```
//!
//! The wait wakes early when a stop is signalled, so shutdown latency is at
//! most one tick interval. Whatever is still buffered at shutdown is flushed
//! before the thread exits. Persistence failures are logged and sampling
//! carries on.

use std::collections::BTreeSet;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace, warn};

use super::resource::ResourceProbe;
use crate::domain::{FunctionIdentity, ProfilerError};
use crate::export::{PerSecondLogEntry, TimeSeriesWriter};
use crate::session::state::{lock_state, SharedState};

const SAMPLER_THREAD_NAME: &str = "callprof-sampler";

/// One tick's reading and the functions it was attributed to.
#[derive(Debug, Clone)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub cpu: f64,
    pub mem: f64,
    pub active: Vec<FunctionIdentity>,
}

/// What the sampler thread hands back when joined.
#[derive(Debug, Clone, Default)]
pub struct SamplerOutput {
    pub series: Vec<PerSecondLogEntry>,
    pub ticks: u64,
    pub persist_failures: usize,
}

/// Sampler settings.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub flush_interval: Duration,
    pub output: Option<TimeSeriesWriter>,
}

/// Periodic read-and-attribute worker. Owned by its thread once spawned.
pub struct Sampler {
    state: SharedState,
    main: FunctionIdentity,
    probe: Box<dyn ResourceProbe>,
    config: SamplerConfig,
    buffer: Vec<Sample>,
    output: SamplerOutput,
    last_flush: Instant,
}

impl Sampler {
    pub fn new(
        state: SharedState,
        main: FunctionIdentity,
        probe: Box<dyn ResourceProbe>,
        config: SamplerConfig,
    ) -> Self {
        Self {
            state,
            main,
            probe,
            config,
            buffer: Vec::new(),
            output: SamplerOutput::default(),
            last_flush: Instant::now(),
        }
    }

    /// Start the sampler on its own thread.
    ///
    /// # Errors
    /// Returns [`ProfilerError::SamplerSpawnFailed`] if the thread cannot be
    /// created.
    pub fn spawn(self) -> Result<SamplerHandle, ProfilerError> {
        let (stop_tx, stop_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name(SAMPLER_THREAD_NAME.to_string())
            .spawn(move || self.run(&stop_rx))
            .map_err(ProfilerError::SamplerSpawnFailed)?;
        Ok(SamplerHandle { stop_tx, handle })
    }

    fn run(mut self, stop_rx: &Receiver<()>) -> SamplerOutput {
        debug!(
            "sampler started (interval {:?}, flush every {:?})",
            self.config.interval, self.config.flush_interval
        );
        self.last_flush = Instant::now();

        loop {
            self.tick();

            match stop_rx.recv_timeout(self.config.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.last_flush.elapsed() >= self.config.flush_interval {
                self.flush();
            }
        }

        self.flush();
        debug!("sampler stopped after {} ticks", self.output.ticks);
        self.output
    }

    /// Read resources and attribute them to the current active set.
    fn tick(&mut self) {
        let reading = self.probe.read();
        let active = {
            let mut state = lock_state(&self.state);
            let snapshot = state.active_snapshot(&self.main);
            state.record_sample(&snapshot, reading.cpu_percent, reading.memory_mb);
            snapshot
        };

        trace!(
            "tick cpu={:.1}% mem={:.1}MB active={}",
            reading.cpu_percent,
            reading.memory_mb,
            active.len()
        );
        self.output.ticks += 1;
        self.buffer.push(Sample {
            timestamp: Local::now(),
            cpu: reading.cpu_percent,
            mem: reading.memory_mb,
            active,
        });
    }

    /// Fold buffered samples into one log entry and persist the series.
    fn flush(&mut self) {
        if let Some(entry) = summarize(&self.buffer) {
            self.output.series.push(entry);
        }
        self.buffer.clear();
        self.last_flush = Instant::now();

        if let Some(writer) = &self.config.output {
            if let Err(e) = writer.write(&self.output.series) {
                self.output.persist_failures += 1;
                warn!("Failed to persist time series: {e}");
            }
        }
    }
}

/// Average the buffered samples and union their active functions.
// Sample counts per flush are tiny
#[allow(clippy::cast_precision_loss)]
fn summarize(samples: &[Sample]) -> Option<PerSecondLogEntry> {
    let last = samples.last()?;
    let count = samples.len() as f64;
    let cpu = samples.iter().map(|s| s.cpu).sum::<f64>() / count;
    let mem = samples.iter().map(|s| s.mem).sum::<f64>() / count;
    let active: BTreeSet<String> =
        samples.iter().flat_map(|s| s.active.iter().map(FunctionIdentity::key)).collect();

    Some(PerSecondLogEntry {
        timestamp: last.timestamp.format("%H:%M:%S").to_string(),
        cpu,
        mem,
        active_functions: active.into_iter().collect(),
    })
}

/// Handle to a running sampler thread.
pub struct SamplerHandle {
    stop_tx: Sender<()>,
    handle: JoinHandle<SamplerOutput>,
}

impl SamplerHandle {
    /// Ask the sampler to stop. Does not wait.
    pub fn signal_stop(&self) {
        // A full channel means a stop is already pending
        let _ = self.stop_tx.try_send(());
    }

    /// Stop the sampler and wait for its final flush.
    pub fn join(self) -> SamplerOutput {
        self.signal_stop();
        drop(self.stop_tx);
        self.handle.join().unwrap_or_else(|_| {
            warn!("Sampler thread panicked; time series is incomplete");
            SamplerOutput::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::resource::ResourceReading;
    use crate::session::state::{MembershipMode, SessionState};
    use std::time::Instant;

    struct FixedProbe(ResourceReading);

    impl ResourceProbe for FixedProbe {
        fn read(&mut self) -> ResourceReading {
            self.0
        }
    }

    fn fixed(cpu: f64, mem: f64) -> Box<dyn ResourceProbe> {
        Box::new(FixedProbe(ResourceReading { cpu_percent: cpu, memory_mb: mem }))
    }

    fn config(interval_ms: u64, flush_ms: u64) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_millis(interval_ms),
            flush_interval: Duration::from_millis(flush_ms),
            output: None,
        }
    }

    #[test]
    fn test_empty_active_set_attributes_to_main() {
        let state = SessionState::shared(MembershipMode::Set);
        let main = FunctionIdentity::main("app.rs");
        let sampler = Sampler::new(state.clone(), main.clone(), fixed(25.0, 50.0), config(5, 1_000));

        let handle = sampler.spawn().unwrap();
        thread::sleep(Duration::from_millis(40));
        let output = handle.join();

        let state = lock_state(&state);
        let acc = state.accumulator(&main).unwrap();
        assert!(!acc.cpu_samples.is_empty());
        assert_eq!(acc.cpu_samples.len() as u64, output.ticks);
        assert_eq!(state.accumulators().count(), 1);
    }

    #[test]
    fn test_samples_attributed_to_active_functions() {
        let state = SessionState::shared(MembershipMode::Set);
        let main = FunctionIdentity::main("app.rs");
        let work = FunctionIdentity::new("app.rs", "work", 12);
        lock_state(&state).push_call(work.clone(), Instant::now());

        let sampler = Sampler::new(state.clone(), main.clone(), fixed(75.0, 10.0), config(5, 1_000));
        let handle = sampler.spawn().unwrap();
        thread::sleep(Duration::from_millis(30));
        handle.join();

        let state = lock_state(&state);
        let acc = state.accumulator(&work).unwrap();
        assert!(acc.cpu_samples.iter().all(|&cpu| (cpu - 75.0).abs() < f64::EPSILON));
        assert!(state.accumulator(&main).is_none());
    }

    #[test]
    fn test_periodic_flush_writes_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let state = SessionState::shared(MembershipMode::Set);
        let main = FunctionIdentity::main("app.rs");
        let mut config = config(5, 20);
        config.output = Some(TimeSeriesWriter::new(&path));

        let handle = Sampler::new(state, main.clone(), fixed(40.0, 20.0), config).spawn().unwrap();
        thread::sleep(Duration::from_millis(120));
        let output = handle.join();

        assert!(output.series.len() >= 2, "expected several flushes, got {}", output.series.len());
        for entry in &output.series {
            assert_eq!(entry.active_functions, vec![main.key()]);
            assert!((entry.cpu - 40.0).abs() < 1e-9);
            assert!((entry.mem - 20.0).abs() < 1e-9);
            assert_eq!(entry.timestamp.len(), 8);
        }

        let persisted = crate::export::load_timeseries(&path).unwrap();
        assert_eq!(persisted, output.series);
    }

    #[test]
    fn test_stop_within_one_interval() {
        let interval = Duration::from_millis(500);
        let state = SessionState::shared(MembershipMode::Set);
        let sampler = Sampler::new(
            state,
            FunctionIdentity::main("app.rs"),
            fixed(0.0, 0.0),
            SamplerConfig { interval, flush_interval: Duration::from_secs(1), output: None },
        );

        let handle = sampler.spawn().unwrap();
        thread::sleep(Duration::from_millis(20));
        let stop_requested = Instant::now();
        let output = handle.join();

        assert!(stop_requested.elapsed() < interval);
        // The final flush always captures the buffered tick.
        assert_eq!(output.series.len(), 1);
    }

    #[test]
    fn test_persist_failure_does_not_stop_sampling() {
        let state = SessionState::shared(MembershipMode::Set);
        let mut config = config(5, 10);
        config.output = Some(TimeSeriesWriter::new("/nonexistent/dir/series.json"));

        let handle = Sampler::new(state, FunctionIdentity::main("app.rs"), fixed(1.0, 1.0), config)
            .spawn()
            .unwrap();
        thread::sleep(Duration::from_millis(60));
        let output = handle.join();

        assert!(output.persist_failures >= 2);
        assert!(output.ticks >= 2);
        assert!(!output.series.is_empty());
    }

    #[test]
    fn test_summarize_unions_active_functions() {
        let a = FunctionIdentity::new("app.rs", "a", 1);
        let b = FunctionIdentity::new("app.rs", "b", 5);
        let now = Local::now();
        let samples = vec![
            Sample { timestamp: now, cpu: 10.0, mem: 100.0, active: vec![a.clone()] },
            Sample { timestamp: now, cpu: 30.0, mem: 300.0, active: vec![a.clone(), b.clone()] },
        ];

        let entry = summarize(&samples).unwrap();
        assert!((entry.cpu - 20.0).abs() < 1e-9);
        assert!((entry.mem - 200.0).abs() < 1e-9);
        assert_eq!(entry.active_functions, vec!["app.rs:a:1", "app.rs:b:5"]);
        assert!(summarize(&[]).is_none());
    }
}
