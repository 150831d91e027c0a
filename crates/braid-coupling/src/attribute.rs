//! Attribute descriptions and potential endpoints.
//!
//! An [`Attribute`] is plain data: which component, which owner object
//! inside it, which accessor, what value type, and which fixed
//! auxiliary arguments. It does nothing until resolved into a
//! [`Producer`](crate::Producer) or [`Consumer`](crate::Consumer).
//!
//! [`PotentialProducer`] and [`PotentialConsumer`] are enumerated from a
//! component's method table. They describe what *could* be wired, with
//! no side effects, and are turned into live endpoints by `actualize`.

use std::fmt;

use braid_core::{
    AttributeError, AuxTypes, ComponentHandle, ComponentId, Direction, ObjectKey, Value, ValueType,
};
use smallvec::SmallVec;

use crate::endpoint::{Consumer, Producer};
use crate::workspace::Workspace;

/// Fixed auxiliary argument values, in declared order.
pub type AuxArgs = SmallVec<[Value; 2]>;

/// Description of a readable or writable endpoint on a component.
///
/// Two attributes are equal when every field is equal, which makes the
/// `(component, object, method, value_type, aux_args)` tuple a stable
/// identity for persistence and duplicate detection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Component that owns the endpoint.
    pub component: ComponentId,
    /// Owner object within the component.
    pub object: ObjectKey,
    /// Accessor name.
    pub method: String,
    /// Type of the value read or written.
    pub value_type: ValueType,
    /// Fixed auxiliary arguments, in declared order.
    pub aux_args: AuxArgs,
}

impl Attribute {
    /// An attribute on the component itself with no auxiliary arguments.
    pub fn new(component: ComponentId, method: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            component,
            object: ObjectKey::root(),
            method: method.into(),
            value_type,
            aux_args: SmallVec::new(),
        }
    }

    /// Address a sub-object instead of the component itself.
    pub fn on_object(mut self, object: impl Into<String>) -> Self {
        self.object = ObjectKey::new(object);
        self
    }

    /// Replace the auxiliary arguments.
    pub fn with_aux_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.aux_args = args.into_iter().collect();
        self
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.component)?;
        if !self.object.is_root() {
            write!(f, "/{}", self.object)?;
        }
        write!(f, ".{}", self.method)?;
        write_aux(f, &self.aux_args)
    }
}

/// Human-readable label used by endpoints and couplings.
pub(crate) fn describe(component_name: &str, attribute: &Attribute) -> String {
    struct Label<'a>(&'a str, &'a Attribute);

    impl fmt::Display for Label<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)?;
            if !self.1.object.is_root() {
                write!(f, "/{}", self.1.object)?;
            }
            write!(f, ".{}", self.1.method)?;
            write_aux(f, &self.1.aux_args)
        }
    }

    Label(component_name, attribute).to_string()
}

fn write_aux(f: &mut fmt::Formatter<'_>, aux: &[Value]) -> fmt::Result {
    if aux.is_empty() {
        return Ok(());
    }
    f.write_str("(")?;
    for (i, arg) in aux.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(")")
}

// ── Potential endpoints ──────────────────────────────────────────

/// A getter that could back a producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PotentialProducer {
    attribute: Attribute,
    component_name: String,
    aux_types: AuxTypes,
}

/// A setter that could back a consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PotentialConsumer {
    attribute: Attribute,
    component_name: String,
    aux_types: AuxTypes,
}

macro_rules! potential_common {
    ($ty:ident, $endpoint:ident, $resolve:ident) => {
        impl $ty {
            /// The attribute this potential endpoint would resolve.
            pub fn attribute(&self) -> &Attribute {
                &self.attribute
            }

            /// Name of the owning component.
            pub fn component_name(&self) -> &str {
                &self.component_name
            }

            /// Value type carried by the accessor.
            pub fn value_type(&self) -> ValueType {
                self.attribute.value_type
            }

            /// Auxiliary argument types that must be supplied before
            /// actualization, in order.
            pub fn aux_types(&self) -> &[ValueType] {
                &self.aux_types
            }

            /// Supply the fixed auxiliary arguments.
            pub fn with_aux_args<I>(mut self, args: I) -> Self
            where
                I: IntoIterator<Item = Value>,
            {
                self.attribute = self.attribute.with_aux_args(args);
                self
            }

            /// Human-readable label.
            pub fn description(&self) -> String {
                describe(&self.component_name, &self.attribute)
            }

            /// Resolve into a live endpoint against `workspace`.
            pub fn actualize(&self, workspace: &Workspace) -> Result<$endpoint, AttributeError> {
                workspace.$resolve(&self.attribute)
            }
        }
    };
}

potential_common!(PotentialProducer, Producer, producer);
potential_common!(PotentialConsumer, Consumer, consumer);

/// Every getter reachable on `handle`, across all owner objects.
pub(crate) fn potential_producers(handle: &ComponentHandle) -> Vec<PotentialProducer> {
    enumerate(handle, Direction::Produce)
        .into_iter()
        .map(|(attribute, aux_types)| PotentialProducer {
            attribute,
            component_name: handle.name().to_string(),
            aux_types,
        })
        .collect()
}

/// Every setter reachable on `handle`, across all owner objects.
pub(crate) fn potential_consumers(handle: &ComponentHandle) -> Vec<PotentialConsumer> {
    enumerate(handle, Direction::Consume)
        .into_iter()
        .map(|(attribute, aux_types)| PotentialConsumer {
            attribute,
            component_name: handle.name().to_string(),
            aux_types,
        })
        .collect()
}

fn enumerate(handle: &ComponentHandle, direction: Direction) -> Vec<(Attribute, AuxTypes)> {
    let (table, objects) = handle.with(|c| (c.method_table(), c.objects()));
    let mut out = Vec::new();
    for object in &objects {
        for method in table.for_kind(&object.kind, direction) {
            let attribute = Attribute {
                component: handle.id(),
                object: object.key.clone(),
                method: method.name().to_string(),
                value_type: method.value_type(),
                aux_args: SmallVec::new(),
            };
            out.push((attribute, method.aux_types().iter().copied().collect()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_object_and_aux() {
        let a = Attribute::new(ComponentId(3), "weight", ValueType::Scalar)
            .on_object("neuron-1")
            .with_aux_args([Value::Integer(5), Value::from("x")]);
        assert_eq!(a.to_string(), "#3/neuron-1.weight(5, \"x\")");
    }

    #[test]
    fn describe_uses_component_name() {
        let a = Attribute::new(ComponentId(3), "activation", ValueType::Scalar);
        assert_eq!(describe("network", &a), "network.activation");
    }

    #[test]
    fn aux_args_are_part_of_identity() {
        let a = Attribute::new(ComponentId(1), "f", ValueType::Scalar);
        let b = a.clone().with_aux_args([Value::Integer(1)]);
        assert_ne!(a, b);
        assert_eq!(b, b.clone());
    }
}
