//! Attributes, couplings, and the workspace registry.
//!
//! An [`Attribute`] describes one readable or writable endpoint on a
//! component. Resolving it against a [`Workspace`] yields a live
//! [`Producer`] or [`Consumer`]. A [`Coupling`] binds one of each and
//! carries a one-slot buffer; the [`CouplingManager`] updates every
//! registered coupling in two passes (buffer all, then commit all) so
//! that every value consumed in a tick comes from the same snapshot of
//! producer state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attribute;
pub mod coupling;
pub mod endpoint;
pub mod manager;
pub mod workspace;

pub use attribute::{Attribute, PotentialConsumer, PotentialProducer};
pub use coupling::Coupling;
pub use endpoint::{Consumer, Producer};
pub use manager::{
    update_couplings, CouplingListener, CouplingManager, CouplingReport, DuplicatePolicy,
};
pub use workspace::{LockedComponents, Workspace};
