//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a component within a workspace.
///
/// Allocated sequentially by the workspace when a component is added.
/// The ordering of `ComponentId` is the global lock order used when
/// every component lock must be held at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ComponentId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Counter for unique [`CouplingId`] allocation.
static COUPLING_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a coupling.
///
/// Allocated from a monotonic atomic counter via [`CouplingId::next`]
/// when the coupling is constructed. Two couplings between the same
/// pair of attributes still receive distinct IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CouplingId(u64);

impl CouplingId {
    /// Allocate a fresh, unique coupling ID. Thread-safe.
    pub fn next() -> Self {
        Self(COUPLING_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CouplingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing tick counter.
///
/// Starts at zero and is incremented once per completed update cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Handle for a registered listener, used to unregister it.
///
/// Allocated sequentially by whichever registry accepted the listener;
/// IDs from different registries are unrelated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Identifies the thread that ran a component update.
///
/// Pool workers are numbered from 1. [`WorkerId::DRIVER`] marks work
/// that ran inline on the engine's driving thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u32);

impl WorkerId {
    /// Work executed on the driving thread rather than a pool worker.
    pub const DRIVER: WorkerId = WorkerId(0);
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DRIVER {
            write!(f, "driver")
        } else {
            write!(f, "worker-{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupling_ids_are_unique() {
        let a = CouplingId::next();
        let b = CouplingId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn tick_next_increments() {
        assert_eq!(TickId(0).next(), TickId(1));
        assert_eq!(TickId::default(), TickId(0));
    }

    #[test]
    fn worker_display() {
        assert_eq!(WorkerId::DRIVER.to_string(), "driver");
        assert_eq!(WorkerId(3).to_string(), "worker-3");
        assert_eq!(ListenerId(2).to_string(), "listener-2");
    }
}
