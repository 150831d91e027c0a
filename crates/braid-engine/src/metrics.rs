//! Per-tick metrics for the update engine.
//!
//! [`TickMetrics`] captures timing and outcome counts for a single tick.
//! The engine keeps the most recent one for
//! [`UpdateEngine::last_metrics`](crate::UpdateEngine::last_metrics) and
//! passes it to [`UpdateListener::tick_completed`](crate::UpdateListener::tick_completed).

use braid_core::{ComponentError, ComponentId, TickId};
use braid_coupling::CouplingReport;

/// Timing and outcome counts collected during a single tick.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// The tick these metrics describe.
    pub tick: TickId,
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Time spent in the controller outside coupling passes, in microseconds.
    pub component_phase_us: u64,
    /// Time spent in coupling passes, in microseconds.
    pub coupling_phase_us: u64,
    /// Component updates that ran, successful or not.
    pub components_updated: usize,
    /// Components passed over because they were disabled.
    pub components_skipped: usize,
    /// Component updates that returned an error or panicked.
    pub component_failures: usize,
    /// Coupling commits that succeeded.
    pub couplings_committed: usize,
    /// Coupling reads or writes that failed.
    pub coupling_failures: usize,
    /// Queued tasks run at the boundaries of this tick.
    pub tasks_drained: usize,
    /// Cumulative component failures since the engine was created.
    pub total_component_failures: u64,
    /// Cumulative coupling failures since the engine was created.
    pub total_coupling_failures: u64,
}

/// Everything the engine learned from one synchronous tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// The tick that completed.
    pub tick: TickId,
    /// Timing and counts.
    pub metrics: TickMetrics,
    /// Components whose update failed, with the error.
    pub component_failures: Vec<(ComponentId, ComponentError)>,
    /// Merged result of every coupling pass run during the tick.
    pub couplings: CouplingReport,
}

impl TickReport {
    /// Returns `true` if no component or coupling failed.
    pub fn is_clean(&self) -> bool {
        self.component_failures.is_empty() && self.couplings.is_clean()
    }
}
