//! Core types and traits for the Braid coupling framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Braid workspace:
//! identifiers, dynamically-typed values, error types, the
//! [`Component`] trait, and the [`MethodTable`] through which a
//! component exposes named accessors for coupling.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod component;
pub mod error;
pub mod id;
pub mod method;
pub mod value;

pub use component::{AsAny, Component, ComponentHandle, ObjectKey, ObjectRef};
pub use error::{
    panic_message, AccessError, AttributeError, ComponentError, CouplingError, CouplingIoError,
    IoPhase,
};
pub use id::{ComponentId, CouplingId, ListenerId, TickId, WorkerId};
pub use method::{
    scalar_arg, AuxTypes, Direction, GetterFn, MethodDescriptor, MethodTable, MethodTableBuilder,
    SetterFn,
};
pub use value::{Value, ValueType};
