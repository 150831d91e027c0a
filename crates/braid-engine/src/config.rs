//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Upper bound on worker threads, applied to explicit and detected counts.
pub const MAX_WORKERS: usize = 64;

// ── EngineConfig ──────────────────────────────────────────────────

/// Configuration for [`UpdateEngine`](crate::UpdateEngine).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Number of worker threads that run component updates. `None` =
    /// auto-detect (`available_parallelism`, clamped to `[1, 64]`).
    pub worker_count: Option<usize>,
    /// Pause between ticks while running. Default: zero (free-running).
    pub tick_delay: Duration,
    /// Wait before retrying when the workspace has no components.
    /// Default: 10ms.
    pub idle_interval: Duration,
    /// When set, the driver waits for every listener event of a tick to
    /// be delivered before it starts the next tick. Default: `false`.
    pub strict_event_ordering: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            tick_delay: Duration::ZERO,
            idle_interval: Duration::from_millis(10),
            strict_event_ordering: false,
        }
    }
}

impl EngineConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.idle_interval.is_zero() {
            return Err(ConfigError::InvalidIdleInterval);
        }
        Ok(())
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, MAX_WORKERS]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, MAX_WORKERS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, MAX_WORKERS),
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating an [`EngineConfig`] or bringing up
/// the engine's threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `worker_count` was `Some(0)`.
    ZeroWorkers,
    /// `idle_interval` was zero, which would spin the driver.
    InvalidIdleInterval,
    /// The change is only allowed while the engine is stopped.
    EngineRunning,
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWorkers => write!(f, "worker_count must be at least 1"),
            Self::InvalidIdleInterval => write!(f, "idle_interval must be non-zero"),
            Self::EngineRunning => write!(f, "engine is running; stop it first"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "thread spawn failed: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}
