//! Braid: coupled component simulation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Braid sub-crates. For most users, adding `braid` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use braid::prelude::*;
//!
//! // Exponential decay toward zero.
//! struct Decay {
//!     level: f64,
//! }
//!
//! impl Component for Decay {
//!     fn update(&mut self) -> Result<(), ComponentError> {
//!         self.level *= 0.5;
//!         Ok(())
//!     }
//!
//!     fn method_table(&self) -> Arc<MethodTable> {
//!         Arc::new(
//!             MethodTable::builder::<Decay>()
//!                 .scalar_getter("level", |d| d.level)
//!                 .scalar_setter("level", |d, v| d.level = v)
//!                 .build(),
//!         )
//!     }
//! }
//!
//! let workspace = Arc::new(Workspace::new());
//! let source = workspace.add_component("source", Decay { level: 8.0 });
//! let mirror = workspace.add_component("mirror", Decay { level: 0.0 });
//! workspace
//!     .couple(
//!         &Attribute::new(source.id(), "level", ValueType::Scalar),
//!         &Attribute::new(mirror.id(), "level", ValueType::Scalar),
//!     )
//!     .unwrap();
//!
//! let engine = UpdateEngine::new(workspace, EngineConfig::default()).unwrap();
//! let report = engine.step().unwrap();
//! assert_eq!(report.tick, TickId(1));
//! assert_eq!(mirror.downcast::<Decay, _>(|d| d.level), Some(4.0));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `braid-core` | IDs, values, errors, the `Component` trait, method tables |
//! | [`coupling`] | `braid-coupling` | Attributes, producers and consumers, couplings, the workspace |
//! | [`engine`] | `braid-engine` | Update engine, controllers, listeners, metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`braid-core`).
///
/// Contains [`types::Value`], the error types, and the [`types::Component`]
/// trait with its [`types::MethodTable`].
pub use braid_core as types;

/// Attributes, endpoints, couplings, and the workspace (`braid-coupling`).
///
/// [`coupling::Workspace`] owns components and their couplings;
/// [`coupling::CouplingManager`] runs the two-phase update.
pub use braid_coupling as coupling;

/// The update engine (`braid-engine`).
///
/// [`engine::UpdateEngine`] drives ticks; [`engine::UpdateController`] is
/// the extension point for custom update policies.
pub use braid_engine as engine;

/// Common imports for typical Braid usage.
///
/// ```rust
/// use braid::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use braid_core::{
        Component, ComponentHandle, ComponentId, CouplingId, MethodTable, ObjectKey, ObjectRef,
        TickId, Value, ValueType,
    };

    // Errors
    pub use braid_core::{AccessError, AttributeError, ComponentError, CouplingError};

    // Coupling
    pub use braid_coupling::{Attribute, Coupling, CouplingReport, Workspace};

    // Engine
    pub use braid_engine::{
        BufferedUpdate, EngineConfig, TickMetrics, TickReport, UpdateController, UpdateControls,
        UpdateEngine, UpdateListener,
    };
}
