//! Test utilities and mock components for Braid development.
//!
//! Provides small [`Component`](braid_core::Component) implementations
//! with known accessors, a shared [`CallLog`] for asserting the order of
//! reads, writes, and updates, and a [`CollectingListener`] that records
//! engine events for inspection.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod components;
pub mod listener;

use std::sync::Arc;

use braid_core::{ComponentId, ValueType};
use braid_coupling::{Attribute, Workspace};
use braid_engine::{EngineConfig, UpdateEngine};

pub use components::{
    Accumulator, Call, CallLog, FaultMode, Faulty, Inspector, NeuronLayer, Recorder, Slow,
};
pub use listener::{CollectingListener, RecordedEvent};

/// Scalar attribute on the component itself.
pub fn scalar(component: ComponentId, method: &str) -> Attribute {
    Attribute::new(component, method, ValueType::Scalar)
}

/// An engine over a fresh workspace with `workers` threads.
pub fn engine(workers: usize) -> UpdateEngine {
    engine_with(EngineConfig {
        worker_count: Some(workers),
        ..EngineConfig::default()
    })
}

/// An engine over a fresh workspace with the given config.
pub fn engine_with(config: EngineConfig) -> UpdateEngine {
    UpdateEngine::new(Arc::new(Workspace::new()), config).expect("valid test engine config")
}
