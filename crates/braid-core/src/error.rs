//! Error types for the Braid coupling framework.
//!
//! Organized by subsystem: attribute resolution (surfaced to callers),
//! component update and coupling I/O (recovered by the engine and the
//! coupling manager), and coupling construction.

use std::any::Any;
use std::error::Error;
use std::fmt;

use crate::component::ObjectKey;
use crate::id::{ComponentId, CouplingId};
use crate::method::Direction;
use crate::value::ValueType;

/// Errors from resolving an attribute into a live producer or consumer.
///
/// Resolution happens once, when the endpoint is built. These errors are
/// always returned to the caller; an unresolvable attribute never
/// degrades into a no-op endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeError {
    /// No component with this ID is registered in the workspace.
    UnknownComponent {
        /// The missing component.
        component: ComponentId,
    },
    /// The component does not expose an owner object with this key.
    UnknownObject {
        /// The component searched.
        component: ComponentId,
        /// The missing object key.
        object: ObjectKey,
    },
    /// No accessor with this name, direction, and object kind exists.
    UnknownMethod {
        /// Kind of the owner object.
        kind: String,
        /// Requested accessor name.
        method: String,
        /// Requested direction.
        direction: Direction,
    },
    /// The accessor exists but carries a different value type.
    ValueTypeMismatch {
        /// Accessor name.
        method: String,
        /// Type declared by the accessor.
        declared: ValueType,
        /// Type requested by the attribute.
        requested: ValueType,
    },
    /// The number of auxiliary arguments does not match the accessor.
    AuxArity {
        /// Accessor name.
        method: String,
        /// Number of auxiliary arguments the accessor declares.
        expected: usize,
        /// Number supplied by the attribute.
        found: usize,
    },
    /// An auxiliary argument has the wrong type.
    AuxTypeMismatch {
        /// Accessor name.
        method: String,
        /// Position of the offending argument among the auxiliaries.
        index: usize,
        /// Declared type at this position.
        expected: ValueType,
        /// Supplied type at this position.
        found: ValueType,
    },
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownComponent { component } => {
                write!(f, "no component with id {component}")
            }
            Self::UnknownObject { component, object } => {
                write!(f, "component {component} has no object '{object}'")
            }
            Self::UnknownMethod {
                kind,
                method,
                direction,
            } => write!(f, "no {direction} '{method}' on objects of kind '{kind}'"),
            Self::ValueTypeMismatch {
                method,
                declared,
                requested,
            } => write!(
                f,
                "accessor '{method}' carries {declared} values, {requested} requested"
            ),
            Self::AuxArity {
                method,
                expected,
                found,
            } => write!(
                f,
                "accessor '{method}' takes {expected} auxiliary arguments, {found} supplied"
            ),
            Self::AuxTypeMismatch {
                method,
                index,
                expected,
                found,
            } => write!(
                f,
                "accessor '{method}' auxiliary argument {index} must be {expected}, got {found}"
            ),
        }
    }
}

impl Error for AttributeError {}

/// Errors raised by a component's `update()`.
///
/// The engine logs these with the component identity and tick number,
/// counts the update as finished, and carries on with the tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentError {
    /// The update returned an error.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The update panicked; the panic was caught by the engine.
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl ComponentError {
    /// Shorthand for [`ComponentError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Build a [`ComponentError::Panicked`] from a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panicked {
            message: panic_message(payload),
        }
    }
}

/// Best-effort text of a panic payload caught by `catch_unwind`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "update failed: {reason}"),
            Self::Panicked { message } => write!(f, "update panicked: {message}"),
        }
    }
}

impl Error for ComponentError {}

/// Errors raised while invoking a resolved accessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// The owner object disappeared after the attribute was resolved.
    MissingObject {
        /// Key of the missing object.
        object: ObjectKey,
    },
    /// The component behind the handle is not the type the accessor
    /// was registered for.
    WrongComponentType,
    /// A value of the wrong type crossed the accessor boundary.
    TypeMismatch {
        /// Type the accessor declares.
        expected: ValueType,
        /// Type actually seen.
        found: ValueType,
    },
    /// An argument could not be interpreted by the accessor.
    InvalidArgument {
        /// Position in the argument list.
        index: usize,
        /// Description of the problem.
        reason: String,
    },
    /// Accessor-specific failure.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl AccessError {
    /// Shorthand for [`AccessError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingObject { object } => write!(f, "object '{object}' no longer exists"),
            Self::WrongComponentType => write!(f, "component type does not match accessor"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected a {expected} value, got {found}")
            }
            Self::InvalidArgument { index, reason } => {
                write!(f, "invalid argument {index}: {reason}")
            }
            Self::Failed { reason } => write!(f, "{reason}"),
        }
    }
}

impl Error for AccessError {}

/// Which half of the two-phase coupling update failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IoPhase {
    /// Reading the producer into the coupling buffer.
    Buffer,
    /// Writing the buffered value into the consumer.
    Commit,
}

impl fmt::Display for IoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer => f.write_str("buffer"),
            Self::Commit => f.write_str("commit"),
        }
    }
}

/// A producer read or consumer write that failed during a coupling pass.
///
/// Recovered by the coupling manager: logged, collected in the pass
/// report, and never allowed to abort the remaining couplings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CouplingIoError {
    /// The failing coupling.
    pub coupling: CouplingId,
    /// Human-readable description of the failing coupling.
    pub description: String,
    /// The pass in which the failure happened.
    pub phase: IoPhase,
    /// The underlying accessor error.
    pub source: AccessError,
}

impl fmt::Display for CouplingIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "coupling {} [{}] {} failed: {}",
            self.coupling, self.description, self.phase, self.source
        )
    }
}

impl Error for CouplingIoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Errors from constructing or registering a coupling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CouplingError {
    /// One of the endpoints could not be resolved.
    Attribute(AttributeError),
    /// Producer and consumer carry different value types.
    TypeMismatch {
        /// Producer's value type.
        producer: ValueType,
        /// Consumer's value type.
        consumer: ValueType,
    },
    /// The registry forbids duplicates and this pair is already coupled.
    Duplicate {
        /// Description of the existing coupling.
        description: String,
    },
}

impl fmt::Display for CouplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(e) => write!(f, "attribute: {e}"),
            Self::TypeMismatch { producer, consumer } => write!(
                f,
                "producer yields {producer} values but consumer accepts {consumer}"
            ),
            Self::Duplicate { description } => {
                write!(f, "coupling already exists: {description}")
            }
        }
    }
}

impl Error for CouplingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Attribute(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AttributeError> for CouplingError {
    fn from(e: AttributeError) -> Self {
        Self::Attribute(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupling_io_error_chains_source() {
        let err = CouplingIoError {
            coupling: CouplingId::next(),
            description: "a.x -> b.y".into(),
            phase: IoPhase::Commit,
            source: AccessError::failed("boom"),
        };
        let text = err.to_string();
        assert!(text.contains("a.x -> b.y"));
        assert!(text.contains("commit"));
        assert!(err.source().is_some());
    }

    #[test]
    fn attribute_error_messages_name_the_method() {
        let err = AttributeError::AuxArity {
            method: "set_weight".into(),
            expected: 2,
            found: 1,
        };
        assert!(err.to_string().contains("set_weight"));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let caught = std::panic::catch_unwind(|| panic!("kaput {}", 7)).unwrap_err();
        assert_eq!(
            ComponentError::from_panic(caught.as_ref()),
            ComponentError::Panicked {
                message: "kaput 7".into()
            }
        );
        let caught = std::panic::catch_unwind(|| std::panic::panic_any(3_u8)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "non-string panic payload");
    }

    #[test]
    fn coupling_error_wraps_attribute_error() {
        let inner = AttributeError::UnknownComponent {
            component: ComponentId(7),
        };
        let err: CouplingError = inner.clone().into();
        assert_eq!(err, CouplingError::Attribute(inner));
        assert!(err.source().is_some());
    }
}
