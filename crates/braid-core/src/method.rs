//! Per-component accessor tables.
//!
//! A [`MethodTable`] is how a component advertises the values it can
//! produce and consume. Each entry is a named getter or setter bound to
//! a kind of owner object, with a declared [`ValueType`] and a list of
//! auxiliary argument types. Entries are type-erased closures built by
//! [`MethodTableBuilder`] from closures over the concrete component.
//!
//! Resolution ([`MethodTable::resolve_getter`],
//! [`MethodTable::resolve_setter`]) checks name, direction, value type,
//! and auxiliary arguments once and returns the erased closure, which
//! the caller caches. Nothing is looked up per tick.
//!
//! # Argument order
//!
//! Getters receive the auxiliary arguments in declared order. Setters
//! receive `[new_value, aux_0, aux_1, ...]`: the written value is
//! always at position 0.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::component::{Component, ObjectKey, ObjectRef};
use crate::error::{AccessError, AttributeError};
use crate::value::{Value, ValueType};

/// Type-erased getter: `(component, object, aux_args) -> value`.
pub type GetterFn =
    dyn Fn(&dyn Any, &ObjectKey, &[Value]) -> Result<Value, AccessError> + Send + Sync;

/// Type-erased setter: `(component, object, [value, aux_args..])`.
pub type SetterFn =
    dyn Fn(&mut dyn Any, &ObjectKey, &[Value]) -> Result<(), AccessError> + Send + Sync;

/// Declared auxiliary argument types of an accessor.
pub type AuxTypes = SmallVec<[ValueType; 2]>;

/// Whether an accessor reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Reads a value (backs a producer).
    Produce,
    /// Writes a value (backs a consumer).
    Consume,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Produce => f.write_str("getter"),
            Self::Consume => f.write_str("setter"),
        }
    }
}

#[derive(Clone)]
enum Accessor {
    Get(Arc<GetterFn>),
    Set(Arc<SetterFn>),
}

/// One accessor registered in a [`MethodTable`].
#[derive(Clone)]
pub struct MethodDescriptor {
    kind: String,
    name: String,
    value_type: ValueType,
    aux_types: AuxTypes,
    accessor: Accessor,
}

impl MethodDescriptor {
    /// Kind of owner object this accessor applies to.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Accessor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read or write.
    pub fn direction(&self) -> Direction {
        match self.accessor {
            Accessor::Get(_) => Direction::Produce,
            Accessor::Set(_) => Direction::Consume,
        }
    }

    /// Type of the value read or written.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Declared auxiliary argument types, in order.
    pub fn aux_types(&self) -> &[ValueType] {
        &self.aux_types
    }

    fn check(&self, value_type: ValueType, aux_args: &[Value]) -> Result<(), AttributeError> {
        if self.value_type != value_type {
            return Err(AttributeError::ValueTypeMismatch {
                method: self.name.clone(),
                declared: self.value_type,
                requested: value_type,
            });
        }
        if self.aux_types.len() != aux_args.len() {
            return Err(AttributeError::AuxArity {
                method: self.name.clone(),
                expected: self.aux_types.len(),
                found: aux_args.len(),
            });
        }
        for (index, (expected, arg)) in self.aux_types.iter().zip(aux_args).enumerate() {
            if arg.value_type() != *expected {
                return Err(AttributeError::AuxTypeMismatch {
                    method: self.name.clone(),
                    index,
                    expected: *expected,
                    found: arg.value_type(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("direction", &self.direction())
            .field("value_type", &self.value_type)
            .field("aux_types", &self.aux_types)
            .finish()
    }
}

type MethodKey = (String, String, Direction);

/// The accessors a component exposes, keyed by
/// `(object kind, name, direction)`.
///
/// Registration order is preserved for enumeration.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: IndexMap<MethodKey, MethodDescriptor>,
}

impl MethodTable {
    /// Start building a table for component type `C`.
    pub fn builder<C: Component>() -> MethodTableBuilder<C> {
        MethodTableBuilder {
            table: MethodTable::default(),
            _marker: PhantomData,
        }
    }

    /// A table with no accessors.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of registered accessors.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no accessors are registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// All accessors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }

    /// Accessors applicable to objects of `kind` in the given direction.
    pub fn for_kind<'a>(
        &'a self,
        kind: &'a str,
        direction: Direction,
    ) -> impl Iterator<Item = &'a MethodDescriptor> + 'a {
        self.methods
            .values()
            .filter(move |m| m.kind == kind && m.direction() == direction)
    }

    /// Look up an accessor without checking its signature.
    pub fn get(&self, kind: &str, name: &str, direction: Direction) -> Option<&MethodDescriptor> {
        self.methods
            .get(&(kind.to_string(), name.to_string(), direction))
    }

    /// Resolve a getter, checking its value type and auxiliary arguments.
    pub fn resolve_getter(
        &self,
        kind: &str,
        name: &str,
        value_type: ValueType,
        aux_args: &[Value],
    ) -> Result<Arc<GetterFn>, AttributeError> {
        let method = self.find(kind, name, Direction::Produce)?;
        method.check(value_type, aux_args)?;
        match &method.accessor {
            Accessor::Get(f) => Ok(Arc::clone(f)),
            Accessor::Set(_) => unreachable!("keyed by direction"),
        }
    }

    /// Resolve a setter, checking its value type and auxiliary arguments.
    pub fn resolve_setter(
        &self,
        kind: &str,
        name: &str,
        value_type: ValueType,
        aux_args: &[Value],
    ) -> Result<Arc<SetterFn>, AttributeError> {
        let method = self.find(kind, name, Direction::Consume)?;
        method.check(value_type, aux_args)?;
        match &method.accessor {
            Accessor::Set(f) => Ok(Arc::clone(f)),
            Accessor::Get(_) => unreachable!("keyed by direction"),
        }
    }

    fn find(
        &self,
        kind: &str,
        name: &str,
        direction: Direction,
    ) -> Result<&MethodDescriptor, AttributeError> {
        self.get(kind, name, direction)
            .ok_or_else(|| AttributeError::UnknownMethod {
                kind: kind.to_string(),
                method: name.to_string(),
                direction,
            })
    }

    fn insert(&mut self, descriptor: MethodDescriptor) {
        let key = (
            descriptor.kind.clone(),
            descriptor.name.clone(),
            descriptor.direction(),
        );
        self.methods.insert(key, descriptor);
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods.values()).finish()
    }
}

/// Typed builder for a [`MethodTable`].
///
/// Closures take the concrete component type; the builder erases them
/// behind a downcast. Registering the same `(kind, name, direction)`
/// twice replaces the earlier entry.
pub struct MethodTableBuilder<C> {
    table: MethodTable,
    _marker: PhantomData<fn(C)>,
}

impl<C: Component> MethodTableBuilder<C> {
    /// Register a getter on objects of `kind`.
    ///
    /// `f` receives the auxiliary arguments in declared order.
    pub fn getter<F>(
        mut self,
        kind: &str,
        name: &str,
        value_type: ValueType,
        aux_types: &[ValueType],
        f: F,
    ) -> Self
    where
        F: Fn(&C, &ObjectKey, &[Value]) -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        let erased = move |any: &dyn Any, object: &ObjectKey, args: &[Value]| {
            let component = any
                .downcast_ref::<C>()
                .ok_or(AccessError::WrongComponentType)?;
            f(component, object, args)
        };
        self.table.insert(MethodDescriptor {
            kind: kind.to_string(),
            name: name.to_string(),
            value_type,
            aux_types: aux_types.iter().copied().collect(),
            accessor: Accessor::Get(Arc::new(erased)),
        });
        self
    }

    /// Register a setter on objects of `kind`.
    ///
    /// `f` receives `[new_value, aux_0, aux_1, ...]`.
    pub fn setter<F>(
        mut self,
        kind: &str,
        name: &str,
        value_type: ValueType,
        aux_types: &[ValueType],
        f: F,
    ) -> Self
    where
        F: Fn(&mut C, &ObjectKey, &[Value]) -> Result<(), AccessError> + Send + Sync + 'static,
    {
        let erased = move |any: &mut dyn Any, object: &ObjectKey, args: &[Value]| {
            let component = any
                .downcast_mut::<C>()
                .ok_or(AccessError::WrongComponentType)?;
            f(component, object, args)
        };
        self.table.insert(MethodDescriptor {
            kind: kind.to_string(),
            name: name.to_string(),
            value_type,
            aux_types: aux_types.iter().copied().collect(),
            accessor: Accessor::Set(Arc::new(erased)),
        });
        self
    }

    /// Register a scalar getter on the component itself.
    pub fn scalar_getter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&C) -> f64 + Send + Sync + 'static,
    {
        self.getter(
            ObjectRef::ROOT_KIND,
            name,
            ValueType::Scalar,
            &[],
            move |c, _, _| Ok(Value::Scalar(f(c))),
        )
    }

    /// Register a scalar setter on the component itself.
    pub fn scalar_setter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut C, f64) + Send + Sync + 'static,
    {
        self.setter(
            ObjectRef::ROOT_KIND,
            name,
            ValueType::Scalar,
            &[],
            move |c, _, args| {
                let v = scalar_arg(args, 0)?;
                f(c, v);
                Ok(())
            },
        )
    }

    /// Finish building.
    pub fn build(self) -> MethodTable {
        self.table
    }
}

/// Extract a scalar argument at `index`, for use inside accessors.
pub fn scalar_arg(args: &[Value], index: usize) -> Result<f64, AccessError> {
    match args.get(index) {
        Some(v) => v.as_scalar().ok_or(AccessError::InvalidArgument {
            index,
            reason: format!("expected scalar, got {}", v.value_type()),
        }),
        None => Err(AccessError::InvalidArgument {
            index,
            reason: "missing argument".to_string(),
        }),
    }
}
