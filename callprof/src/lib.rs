//! # callprof - In-process Call and Resource Profiler
//!
//! callprof runs a piece of code to completion while recording two things:
//! every call boundary inside one chosen source file, and periodic process
//! CPU/memory readings attributed to whichever of those functions were
//! active when the reading was taken.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Instrumented Code                           │
//! │          tracer.scope(location!("parse")) / tracer.call(..)     │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ enter / exit events (target file only)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       callprof                                  │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐     │
//! │  │    Tracer    │──▶│  SessionState    │◀──│   Sampler    │     │
//! │  │ (caller thr) │   │ (one Mutex)      │   │ (own thread) │     │
//! │  └──────────────┘   └────────┬─────────┘   └──────┬───────┘     │
//! │                              │                    │ flush       │
//! │                              ▼                    ▼             │
//! │                     ┌──────────────┐   ┌────────────────────┐   │
//! │                     │  Aggregator  │   │ realtime_monitor   │   │
//! │                     │              │   │      .json         │   │
//! │                     └──────┬───────┘   └────────────────────┘   │
//! │                            ▼                                    │
//! │                  ┌─────────────────────────┐                    │
//! │                  │ function_statistics.json│                    │
//! │                  └─────────────────────────┘                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`session`]: configuration, shared state and the run lifecycle
//!   - `driver`: starts the sampler, runs the target, finalizes output
//!   - `state`: call stack, active set and per-function accumulators
//! - [`profiling`]: the tracer, the background sampler and the resource probe
//! - [`analysis`]: per-function statistics from the accumulated state
//! - [`export`]: JSON artifacts and the tabular text report
//! - [`preflight`]: target validation and path matching
//! - [`domain`]: identities, call events and error types
//! - [`cli`]: arguments of the report binary
//!
//! ## Typical Usage
//!
//! ```ignore
//! use callprof::{location, Session, SessionConfig};
//!
//! let target = concat!(env!("CARGO_MANIFEST_DIR"), "/src/main.rs");
//! let config = SessionConfig::new(target).with_output_dir(Path::new("out"));
//! let (answer, output) = Session::new(config)?.run(|tracer| {
//!     let _scope = tracer.scope(location!("compute"));
//!     Ok::<_, std::convert::Infallible>(42)
//! })?;
//! ```
//!
//! ```bash
//! # Print the report of a finished session
//! callprof --stats out/function_statistics.json --timeseries out/realtime_monitor.json
//! ```
//!
//! ## Key Concepts
//!
//! - **Target**: the single source file whose functions are recorded
//! - **Active set**: functions entered and not yet exited
//! - **Tick**: one sampler read-and-attribute cycle
//! - **Flush**: folding a window of ticks into one per-second log entry

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod preflight;
pub mod profiling;
pub mod session;

pub use analysis::{FunctionStats, StatsReport};
pub use domain::{CodeLocation, ExportError, FunctionIdentity, ProfilerError};
pub use profiling::{ProcessProbe, ResourceProbe, ResourceReading, ScopeGuard, Tracer};
pub use session::{
    MembershipMode, Session, SessionConfig, SessionError, SessionOutput, SessionPhase,
};
