//! Post-run aggregation of per-function data.
//!
//! Turns the raw accumulators left in [`SessionState`] into one
//! [`FunctionStats`] per function.
//!
//! # Data Flow
//!
//! ```text
//! SessionState (read-only after the sampler is joined)
//!     │
//!     └──► aggregate() ──► StatsReport
//!                              ├──► rows()    ← sorted, for display
//!                              └──► to_map()  ← keyed, for persistence
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::FunctionIdentity;
use crate::session::state::{FunctionAccumulator, SessionState};

/// Summary statistics for one function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionStats {
    pub calls: u64,
    /// Sum of completed-call durations, in seconds.
    pub total_time: f64,
    pub avg_cpu: f64,
    /// Megabytes.
    pub avg_mem: f64,
    pub peak_cpu: f64,
    /// Megabytes.
    pub peak_mem: f64,
}

impl FunctionStats {
    fn from_accumulator(acc: &FunctionAccumulator) -> Self {
        Self {
            calls: acc.calls,
            total_time: acc.durations.iter().map(std::time::Duration::as_secs_f64).sum(),
            avg_cpu: mean(&acc.cpu_samples),
            avg_mem: mean(&acc.mem_samples),
            peak_cpu: peak(&acc.cpu_samples),
            peak_mem: peak(&acc.mem_samples),
        }
    }
}

/// Aggregated statistics for every function except `<main>`, ordered by
/// total time (descending).
#[derive(Debug, Clone, Default)]
pub struct StatsReport {
    entries: Vec<(FunctionIdentity, FunctionStats)>,
}

impl StatsReport {
    pub fn entries(&self) -> &[(FunctionIdentity, FunctionStats)] {
        &self.entries
    }

    pub fn get(&self, identity: &FunctionIdentity) -> Option<&FunctionStats> {
        self.entries.iter().find(|(id, _)| id == identity).map(|(_, stats)| stats)
    }

    /// Look up by function name. Returns the first match in report order.
    pub fn by_function(&self, function: &str) -> Option<&FunctionStats> {
        self.entries.iter().find(|(id, _)| id.function() == function).map(|(_, stats)| stats)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display rows keyed by `file:function:line`, in report order.
    pub fn rows(&self) -> Vec<(String, FunctionStats)> {
        self.entries.iter().map(|(id, stats)| (id.key(), *stats)).collect()
    }

    /// Mapping used for the persisted statistics file.
    pub fn to_map(&self) -> BTreeMap<String, FunctionStats> {
        self.entries.iter().map(|(id, stats)| (id.key(), *stats)).collect()
    }
}

/// Reduce the session state to per-function statistics.
///
/// Every function that was entered at least once or received a sample is
/// included, apart from the synthetic `<main>` scope.
#[must_use]
pub fn aggregate(state: &SessionState) -> StatsReport {
    let mut entries: Vec<(FunctionIdentity, FunctionStats)> = state
        .accumulators()
        .filter(|(identity, _)| !identity.is_main())
        .map(|(identity, acc)| (identity.clone(), FunctionStats::from_accumulator(acc)))
        .collect();

    entries.sort_by(|(a_id, a), (b_id, b)| {
        b.total_time.total_cmp(&a.total_time).then_with(|| a_id.cmp(b_id))
    });

    StatsReport { entries }
}

// Sample counts stay far below 2^53
#[allow(clippy::cast_precision_loss)]
fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

fn peak(samples: &[f64]) -> f64 {
    samples.iter().copied().reduce(f64::max).unwrap_or(0.0)
}
