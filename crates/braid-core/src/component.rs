//! The [`Component`] trait and the [`ComponentHandle`] lock token.
//!
//! A component is the opaque unit of simulation. The framework only
//! needs three things from it: an `update()` operation, a
//! [`MethodTable`] describing the accessors it exposes for coupling,
//! and the list of owner objects those accessors address.
//!
//! Every component lives behind the mutex in its [`ComponentHandle`].
//! That mutex is the component's lock token: `update()` runs while
//! holding it, and so does every producer read and consumer write
//! addressed to the component.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ComponentError;
use crate::id::ComponentId;
use crate::method::MethodTable;

/// Upcast to [`Any`] for accessor downcasting.
///
/// Blanket-implemented for every `'static` type; component authors
/// never implement it by hand.
pub trait AsAny {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Names an owner object inside a component.
///
/// Accessors address either the component itself ([`ObjectKey::root`])
/// or one of its sub-objects, such as a single neuron in a network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Key naming the component itself.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Key naming a sub-object.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Whether this key names the component itself.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for ObjectKey {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

/// An owner object together with its kind.
///
/// The kind selects which [`MethodTable`] entries apply to the object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Key of the object within its component.
    pub key: ObjectKey,
    /// Kind of the object, matched against accessor registrations.
    pub kind: String,
}

impl ObjectRef {
    /// Kind reported for the component itself.
    pub const ROOT_KIND: &'static str = "component";

    /// The component itself.
    pub fn root() -> Self {
        Self {
            key: ObjectKey::root(),
            kind: Self::ROOT_KIND.to_string(),
        }
    }

    /// A sub-object of the given kind.
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: ObjectKey::new(key),
            kind: kind.into(),
        }
    }
}

/// The opaque unit of simulation.
///
/// # Contract
///
/// - `update()` may take arbitrarily long and may fail. Failures and
///   panics are caught by the engine and never stop the simulation.
/// - `method_table()` is consulted only when an attribute is resolved
///   or enumerated, never per tick. Implementations usually build the
///   table once and hand out clones of an `Arc`.
/// - `update()` must not try to lock its own handle or call
///   `Workspace::with_all_locks`; it already holds its own lock.
pub trait Component: AsAny + Send + 'static {
    /// Advance this component by one tick.
    fn update(&mut self) -> Result<(), ComponentError>;

    /// Accessors this component exposes for coupling.
    fn method_table(&self) -> Arc<MethodTable>;

    /// Owner objects addressable by accessors.
    ///
    /// Default: only the component itself.
    fn objects(&self) -> Vec<ObjectRef> {
        vec![ObjectRef::root()]
    }
}

struct HandleInner {
    id: ComponentId,
    name: String,
    enabled: AtomicBool,
    cell: Mutex<Box<dyn Component>>,
}

/// Shared handle to a registered component.
///
/// Cloning is cheap and every clone refers to the same component and
/// the same lock.
#[derive(Clone)]
pub struct ComponentHandle {
    inner: Arc<HandleInner>,
}

impl ComponentHandle {
    /// Wrap a component under the given identity.
    pub fn new(id: ComponentId, name: impl Into<String>, component: Box<dyn Component>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                name: name.into(),
                enabled: AtomicBool::new(true),
                cell: Mutex::new(component),
            }),
        }
    }

    /// The component's workspace ID.
    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    /// The component's display name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the engine updates this component. Default: `true`.
    ///
    /// A disabled component is skipped by the update phase but its
    /// accessors keep working, so couplings into and out of it still run.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Turn engine updates of this component on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    /// Acquire the component's lock.
    ///
    /// A lock poisoned by a panicking update is recovered: the engine
    /// already reported that panic, and the component keeps running.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Component>> {
        self.inner
            .cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the component while holding its lock.
    pub fn with<R>(&self, f: impl FnOnce(&dyn Component) -> R) -> R {
        let guard = self.lock();
        f(&**guard)
    }

    /// Run `f` against the component mutably while holding its lock.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut dyn Component) -> R) -> R {
        let mut guard = self.lock();
        f(&mut **guard)
    }

    /// Run `f` against the concrete component type, if it matches.
    pub fn downcast<C: Component, R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        let guard = self.lock();
        let component: &dyn Component = &**guard;
        component.as_any().downcast_ref::<C>().map(f)
    }

    /// Run `f` against the concrete component type mutably, if it matches.
    pub fn downcast_mut<C: Component, R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let mut guard = self.lock();
        let component: &mut dyn Component = &mut **guard;
        component.as_any_mut().downcast_mut::<C>().map(f)
    }

    /// Whether two handles refer to the same component.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl fmt::Display for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.inner.name, self.inner.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;
    use crate::Value;

    struct Counter {
        count: u32,
    }

    impl Component for Counter {
        fn update(&mut self) -> Result<(), ComponentError> {
            self.count += 1;
            Ok(())
        }

        fn method_table(&self) -> Arc<MethodTable> {
            Arc::new(
                MethodTable::builder::<Counter>()
                    .scalar_getter("count", |c| f64::from(c.count))
                    .build(),
            )
        }
    }

    fn handle() -> ComponentHandle {
        ComponentHandle::new(ComponentId(1), "counter", Box::new(Counter { count: 0 }))
    }

    #[test]
    fn downcast_reaches_concrete_type() {
        let h = handle();
        h.with_mut(|c| c.update()).unwrap();
        assert_eq!(h.downcast::<Counter, _>(|c| c.count), Some(1));
    }

    #[test]
    fn method_table_through_dyn() {
        let h = handle();
        let table = h.with(|c| c.method_table());
        let getter = table
            .resolve_getter(ObjectRef::ROOT_KIND, "count", ValueType::Scalar, &[])
            .unwrap();
        let guard = h.lock();
        let component: &dyn Component = &**guard;
        let v = getter(component.as_any(), &ObjectKey::root(), &[]).unwrap();
        assert_eq!(v, Value::Scalar(0.0));
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let h = handle();
        let h2 = h.clone();
        let _ = std::thread::spawn(move || {
            let _guard = h2.lock();
            panic!("poison");
        })
        .join();
        assert_eq!(h.downcast::<Counter, _>(|c| c.count), Some(0));
    }

    #[test]
    fn enabled_flag_round_trips() {
        let h = handle();
        assert!(h.is_enabled());
        h.set_enabled(false);
        assert!(!h.clone().is_enabled());
    }

    #[test]
    fn root_object_defaults() {
        let h = handle();
        let objects = h.with(|c| c.objects());
        assert_eq!(objects, vec![ObjectRef::root()]);
        assert!(objects[0].key.is_root());
    }
}
