//! # Session State
//!
//! Everything the tracer and the sampler share: the call stack, the set of
//! functions currently in progress, and the per-function accumulators.
//!
//! ## Locking
//!
//! The whole structure lives behind one `Mutex` ([`SharedState`]). Each tracer
//! event and each sampler tick takes the lock once, applies a single-step
//! update or snapshot, and releases it. No I/O happens under the lock.
//!
//! ## Active-set membership
//!
//! With [`MembershipMode::Set`] a function is either active or not; the first
//! return of a recursive function removes it even though outer invocations
//! are still running. [`MembershipMode::RefCounted`] keeps one count per
//! nested invocation and only drops the function when the outermost call
//! returns.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::FunctionIdentity;

/// State shared between the instrumented thread and the sampler thread.
pub type SharedState = Arc<Mutex<SessionState>>;

/// Lock the shared state, recovering from poisoning.
///
/// Every mutation is applied in one step, so a panic on another thread can
/// never leave the state half-updated.
pub fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How the active set counts nested invocations of the same function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MembershipMode {
    /// Plain set membership. The first matching return removes the function.
    #[default]
    Set,
    /// One count per open invocation. The function stays active until all
    /// of its invocations have returned.
    RefCounted,
}

/// One open invocation on the call stack.
#[derive(Debug, Clone)]
pub struct CallStackFrame {
    pub identity: FunctionIdentity,
    pub entered_at: Instant,
}

/// Raw per-function data collected during the run.
#[derive(Debug, Clone, Default)]
pub struct FunctionAccumulator {
    pub calls: u64,
    pub durations: Vec<Duration>,
    pub cpu_samples: Vec<f64>,
    pub mem_samples: Vec<f64>,
}

/// Functions currently in progress.
#[derive(Debug, Default)]
struct ActiveSet {
    mode: MembershipMode,
    members: HashMap<FunctionIdentity, usize>,
}

impl ActiveSet {
    fn new(mode: MembershipMode) -> Self {
        Self { mode, members: HashMap::new() }
    }

    fn insert(&mut self, identity: FunctionIdentity) {
        let count = self.members.entry(identity).or_insert(0);
        match self.mode {
            MembershipMode::Set => *count = 1,
            MembershipMode::RefCounted => *count += 1,
        }
    }

    fn remove(&mut self, identity: &FunctionIdentity) {
        match self.mode {
            MembershipMode::Set => {
                self.members.remove(identity);
            }
            MembershipMode::RefCounted => {
                if let Some(count) = self.members.get_mut(identity) {
                    *count -= 1;
                    if *count == 0 {
                        self.members.remove(identity);
                    }
                }
            }
        }
    }

    fn contains(&self, identity: &FunctionIdentity) -> bool {
        self.members.contains_key(identity)
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn sorted(&self) -> Vec<FunctionIdentity> {
        let mut members: Vec<FunctionIdentity> = self.members.keys().cloned().collect();
        members.sort();
        members
    }
}

/// Call stack, active set and per-function accumulators for one session.
#[derive(Debug)]
pub struct SessionState {
    stack: Vec<CallStackFrame>,
    active: ActiveSet,
    functions: HashMap<FunctionIdentity, FunctionAccumulator>,
    ticks: u64,
}

impl SessionState {
    pub fn new(mode: MembershipMode) -> Self {
        Self {
            stack: Vec::new(),
            active: ActiveSet::new(mode),
            functions: HashMap::new(),
            ticks: 0,
        }
    }

    /// Wrap a fresh state for sharing between tracer and sampler.
    pub fn shared(mode: MembershipMode) -> SharedState {
        Arc::new(Mutex::new(Self::new(mode)))
    }

    pub fn membership(&self) -> MembershipMode {
        self.active.mode
    }

    /// Record a function entry.
    pub fn push_call(&mut self, identity: FunctionIdentity, now: Instant) {
        self.functions.entry(identity.clone()).or_default().calls += 1;
        self.active.insert(identity.clone());
        self.stack.push(CallStackFrame { identity, entered_at: now });
    }

    /// Record a function exit.
    ///
    /// The stack is only popped when its top frame belongs to `identity`; the
    /// active set is updated regardless. Returns the elapsed time of the popped
    /// frame, if any.
    pub fn pop_call(&mut self, identity: &FunctionIdentity, now: Instant) -> Option<Duration> {
        let top_matches = self.stack.last().is_some_and(|top| top.identity == *identity);
        let popped = if top_matches { self.stack.pop() } else { None };
        let elapsed = popped.map(|frame| {
            let elapsed = now.saturating_duration_since(frame.entered_at);
            self.functions.entry(frame.identity).or_default().durations.push(elapsed);
            elapsed
        });
        self.active.remove(identity);
        elapsed
    }

    /// Active functions right now, sorted. Substitutes `fallback` when the set
    /// is empty.
    pub fn active_snapshot(&self, fallback: &FunctionIdentity) -> Vec<FunctionIdentity> {
        if self.active.is_empty() {
            vec![fallback.clone()]
        } else {
            self.active.sorted()
        }
    }

    /// Attribute one resource reading to every identity in `active`.
    pub fn record_sample(&mut self, active: &[FunctionIdentity], cpu: f64, mem: f64) {
        self.ticks += 1;
        for identity in active {
            let acc = self.functions.entry(identity.clone()).or_default();
            acc.cpu_samples.push(cpu);
            acc.mem_samples.push(mem);
        }
    }

    pub fn is_active(&self, identity: &FunctionIdentity) -> bool {
        self.active.contains(identity)
    }

    pub fn active_functions(&self) -> BTreeSet<FunctionIdentity> {
        self.active.members.keys().cloned().collect()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &[CallStackFrame] {
        &self.stack
    }

    /// True when the active set is empty exactly when the stack is.
    pub fn is_consistent(&self) -> bool {
        self.active.is_empty() == self.stack.is_empty()
    }

    pub fn accumulator(&self, identity: &FunctionIdentity) -> Option<&FunctionAccumulator> {
        self.functions.get(identity)
    }

    pub fn accumulators(&self) -> impl Iterator<Item = (&FunctionIdentity, &FunctionAccumulator)> {
        self.functions.iter()
    }

    /// Number of sampler ticks attributed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
