//! Live producers and consumers.
//!
//! Both are built by resolving an [`Attribute`] once against its
//! component's method table. They cache the resolved accessor and a
//! clone of the component handle; every read or write takes the owning
//! component's lock for the duration of the call and nothing else.

use std::fmt;
use std::sync::Arc;

use braid_core::{
    AccessError, AttributeError, Component, ComponentHandle, ComponentId, GetterFn, ObjectKey,
    SetterFn, Value, ValueType,
};
use smallvec::SmallVec;

use crate::attribute::{describe, Attribute};

fn object_kind(
    component: &dyn Component,
    id: ComponentId,
    object: &ObjectKey,
) -> Result<String, AttributeError> {
    component
        .objects()
        .into_iter()
        .find(|o| &o.key == object)
        .map(|o| o.kind)
        .ok_or_else(|| AttributeError::UnknownObject {
            component: id,
            object: object.clone(),
        })
}

fn check_component(handle: &ComponentHandle, attribute: &Attribute) -> Result<(), AttributeError> {
    if handle.id() != attribute.component {
        return Err(AttributeError::UnknownComponent {
            component: attribute.component,
        });
    }
    Ok(())
}

// ── Producer ─────────────────────────────────────────────────────

/// Read side of a coupling: yields a value on demand.
#[derive(Clone)]
pub struct Producer {
    attribute: Attribute,
    handle: ComponentHandle,
    getter: Arc<GetterFn>,
    description: String,
}

impl Producer {
    /// Resolve `attribute` against the component behind `handle`.
    ///
    /// Fails if the handle is not the attribute's component, the owner
    /// object does not exist, or no getter matches the name, value
    /// type, and auxiliary arguments.
    pub fn bind(handle: &ComponentHandle, attribute: Attribute) -> Result<Self, AttributeError> {
        check_component(handle, &attribute)?;
        let getter = handle.with(|component| {
            let kind = object_kind(component, handle.id(), &attribute.object)?;
            component.method_table().resolve_getter(
                &kind,
                &attribute.method,
                attribute.value_type,
                &attribute.aux_args,
            )
        })?;
        Ok(Self {
            description: describe(handle.name(), &attribute),
            attribute,
            handle: handle.clone(),
            getter,
        })
    }

    /// Read the current value while holding the owning component's lock.
    pub fn read(&self) -> Result<Value, AccessError> {
        let value = {
            let guard = self.handle.lock();
            let component: &dyn Component = &**guard;
            (self.getter)(
                component.as_any(),
                &self.attribute.object,
                &self.attribute.aux_args,
            )?
        };
        if value.value_type() != self.attribute.value_type {
            return Err(AccessError::TypeMismatch {
                expected: self.attribute.value_type,
                found: value.value_type(),
            });
        }
        Ok(value)
    }

    /// The attribute this producer was resolved from.
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Handle of the owning component.
    pub fn component(&self) -> &ComponentHandle {
        &self.handle
    }

    /// Type of the values produced.
    pub fn value_type(&self) -> ValueType {
        self.attribute.value_type
    }

    /// Human-readable label, e.g. `network/neuron-3.activation`.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("attribute", &self.attribute)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ── Consumer ─────────────────────────────────────────────────────

/// Write side of a coupling: accepts a value and applies it.
#[derive(Clone)]
pub struct Consumer {
    attribute: Attribute,
    handle: ComponentHandle,
    setter: Arc<SetterFn>,
    description: String,
}

impl Consumer {
    /// Resolve `attribute` against the component behind `handle`.
    pub fn bind(handle: &ComponentHandle, attribute: Attribute) -> Result<Self, AttributeError> {
        check_component(handle, &attribute)?;
        let setter = handle.with(|component| {
            let kind = object_kind(component, handle.id(), &attribute.object)?;
            component.method_table().resolve_setter(
                &kind,
                &attribute.method,
                attribute.value_type,
                &attribute.aux_args,
            )
        })?;
        Ok(Self {
            description: describe(handle.name(), &attribute),
            attribute,
            handle: handle.clone(),
            setter,
        })
    }

    /// Apply `value` while holding the owning component's lock.
    ///
    /// The setter is invoked with `[value, aux_0, aux_1, ...]`.
    pub fn write(&self, value: Value) -> Result<(), AccessError> {
        if value.value_type() != self.attribute.value_type {
            return Err(AccessError::TypeMismatch {
                expected: self.attribute.value_type,
                found: value.value_type(),
            });
        }
        let mut args: SmallVec<[Value; 3]> =
            SmallVec::with_capacity(1 + self.attribute.aux_args.len());
        args.push(value);
        args.extend(self.attribute.aux_args.iter().cloned());

        let mut guard = self.handle.lock();
        let component: &mut dyn Component = &mut **guard;
        (self.setter)(component.as_any_mut(), &self.attribute.object, &args)
    }

    /// The attribute this consumer was resolved from.
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Handle of the owning component.
    pub fn component(&self) -> &ComponentHandle {
        &self.handle
    }

    /// Type of the values accepted.
    pub fn value_type(&self) -> ValueType {
        self.attribute.value_type
    }

    /// Human-readable label, e.g. `world/agent.heading`.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("attribute", &self.attribute)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
