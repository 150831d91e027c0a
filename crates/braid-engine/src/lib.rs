//! Tick-driven update engine for Braid workspaces.
//!
//! [`UpdateEngine`] advances every component of a
//! [`Workspace`](braid_coupling::Workspace) on a worker pool, then runs
//! the two-phase coupling update, once per tick. The per-tick policy is
//! an [`UpdateController`]; progress is reported to [`UpdateListener`]s
//! from a dedicated notifier thread.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod controls;
pub mod engine;
mod latch;
pub mod metrics;
pub mod notify;
mod pool;
mod tasks;

pub use config::{ConfigError, EngineConfig, MAX_WORKERS};
pub use controller::{
    ActionSequence, BufferedUpdate, PriorityUpdate, SerialUpdate, UpdateAction, UpdateController,
};
pub use controls::UpdateControls;
pub use engine::UpdateEngine;
pub use latch::Completion;
pub use metrics::{TickMetrics, TickReport};
pub use notify::{ComponentEvent, UpdateListener, UpdateOutcome};
