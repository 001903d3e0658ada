//! # Call Tracer
//!
//! Receives call-boundary events from instrumented code and applies them to
//! the session state. Runs inline on the instrumented thread; each event takes
//! the state lock once.
//!
//! Events whose file is not the session target are dropped before any state
//! is touched, as is everything reported after the tracer is uninstalled.
//!
//! ## Instrumenting code
//!
//! ```ignore
//! fn parse(tracer: &Tracer, input: &str) -> usize {
//!     let _scope = tracer.scope(location!("parse"));
//!     input.len()
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::trace;

use crate::domain::{CallEvent, CodeLocation, EventKind, FunctionIdentity};
use crate::preflight::Target;
use crate::session::state::{lock_state, SessionState, SharedState};

/// Session-owned handle that instrumented code reports call boundaries to.
///
/// Cloning is cheap and clones share the installed flag, so uninstalling
/// the session's tracer silences every clone.
#[derive(Clone)]
pub struct Tracer {
    target: Arc<Target>,
    state: SharedState,
    installed: Arc<AtomicBool>,
}

impl Tracer {
    /// Create an uninstalled tracer for `target`.
    pub fn new(target: Arc<Target>, state: SharedState) -> Self {
        Self { target, state, installed: Arc::new(AtomicBool::new(false)) }
    }

    pub(crate) fn install(&self) {
        self.installed.store(true, Ordering::Release);
    }

    pub(crate) fn uninstall(&self) {
        self.installed.store(false, Ordering::Release);
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Apply one call-boundary event.
    ///
    /// Returns `true` when the event was recorded, `false` when it was
    /// filtered out.
    pub fn record(&self, event: &CallEvent) -> bool {
        if !self.is_installed() || !self.target.matches(&event.location.file) {
            return false;
        }

        let identity = FunctionIdentity::from_location(&event.location);
        let now = Instant::now();
        let mut state = lock_state(&self.state);
        match event.kind {
            EventKind::Enter => {
                trace!("enter {identity}");
                state.push_call(identity, now);
            }
            EventKind::Exit => {
                trace!("exit {identity}");
                state.pop_call(&identity, now);
            }
        }
        true
    }

    pub fn enter(&self, location: &CodeLocation) -> bool {
        self.record(&CallEvent::enter(location.clone()))
    }

    pub fn exit(&self, location: &CodeLocation) -> bool {
        self.record(&CallEvent::exit(location.clone()))
    }

    /// Enter `location` and return a guard that reports the exit when dropped,
    /// including during unwinding.
    #[must_use = "dropping the scope immediately records an empty call; bind it with `let _scope = ...`"]
    pub fn scope(&self, location: CodeLocation) -> ScopeGuard<'_> {
        self.enter(&location);
        ScopeGuard { tracer: self, location }
    }

    /// Run `f` as one call of `location`.
    pub fn call<R>(&self, location: CodeLocation, f: impl FnOnce() -> R) -> R {
        let _scope = self.scope(location);
        f()
    }

    /// Run `f` against a consistent view of the session state.
    ///
    /// Holds the state lock for the duration of `f`; do not report events
    /// from inside it.
    pub fn inspect<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&lock_state(&self.state))
    }

    /// Enter the synthetic whole-program scope.
    pub(crate) fn enter_main(&self) {
        let main = self.main_location();
        self.enter(&main);
    }

    /// Exit the synthetic whole-program scope.
    pub(crate) fn exit_main(&self) {
        let main = self.main_location();
        self.exit(&main);
    }

    fn main_location(&self) -> CodeLocation {
        let main = self.target.main_identity();
        CodeLocation::new(self.target.file().to_string(), main.function().to_string(), main.line())
    }
}

/// RAII guard returned by [`Tracer::scope`]. Reports the exit on drop.
pub struct ScopeGuard<'a> {
    tracer: &'a Tracer,
    location: CodeLocation,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.tracer.exit(&self.location);
    }
}
