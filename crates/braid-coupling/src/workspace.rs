//! The workspace: the live set of components and their couplings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use braid_core::{
    AttributeError, Component, ComponentHandle, ComponentId, CouplingError, CouplingId,
};
use indexmap::IndexMap;

use crate::attribute::{self, Attribute, PotentialConsumer, PotentialProducer};
use crate::coupling::Coupling;
use crate::endpoint::{Consumer, Producer};
use crate::manager::{CouplingManager, DuplicatePolicy};

/// Owns the components of a simulation and the couplings between them.
///
/// Components are kept in insertion order and are identified by a
/// [`ComponentId`] assigned here, starting at 1 and never reused.
/// Every method takes `&self`, so a workspace is shared between the
/// engine and the application behind an `Arc`.
pub struct Workspace {
    next_id: AtomicU64,
    components: RwLock<IndexMap<ComponentId, ComponentHandle>>,
    couplings: CouplingManager,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// An empty workspace that allows duplicate couplings.
    pub fn new() -> Self {
        Self::with_duplicate_policy(DuplicatePolicy::Allow)
    }

    /// An empty workspace with the given duplicate-coupling policy.
    pub fn with_duplicate_policy(policy: DuplicatePolicy) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            components: RwLock::new(IndexMap::new()),
            couplings: CouplingManager::new(policy),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<ComponentId, ComponentHandle>> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<ComponentId, ComponentHandle>> {
        self.components
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Components ───────────────────────────────────────────────

    /// Register a component under `name` and return its handle.
    pub fn add_component<C: Component>(
        &self,
        name: impl Into<String>,
        component: C,
    ) -> ComponentHandle {
        self.add_boxed_component(name, Box::new(component))
    }

    /// Register an already-boxed component.
    pub fn add_boxed_component(
        &self,
        name: impl Into<String>,
        component: Box<dyn Component>,
    ) -> ComponentHandle {
        let id = ComponentId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = ComponentHandle::new(id, name, component);
        log::debug!("component added: {handle}");
        self.write().insert(id, handle.clone());
        handle
    }

    /// Unregister a component and every coupling touching it.
    ///
    /// A tick already running keeps its snapshot and may still update
    /// the component once more; no later tick sees it.
    pub fn remove_component(&self, id: ComponentId) -> Option<ComponentHandle> {
        let handle = self.write().shift_remove(&id)?;
        let dropped = self.couplings.remove_component(id);
        log::debug!(
            "component removed: {handle} ({} couplings dropped)",
            dropped.len()
        );
        Some(handle)
    }

    /// Look up a component by ID.
    pub fn component(&self, id: ComponentId) -> Option<ComponentHandle> {
        self.read().get(&id).cloned()
    }

    /// First component registered under `name`.
    pub fn component_by_name(&self, name: &str) -> Option<ComponentHandle> {
        self.read().values().find(|h| h.name() == name).cloned()
    }

    /// Snapshot of every component, in insertion order.
    pub fn components(&self) -> Vec<ComponentHandle> {
        self.read().values().cloned().collect()
    }

    /// Number of registered components.
    pub fn component_count(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if no components are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // ── Attributes and couplings ─────────────────────────────────

    /// The coupling registry.
    pub fn couplings(&self) -> &CouplingManager {
        &self.couplings
    }

    fn handle_for(&self, attribute: &Attribute) -> Result<ComponentHandle, AttributeError> {
        self.component(attribute.component)
            .ok_or(AttributeError::UnknownComponent {
                component: attribute.component,
            })
    }

    /// Resolve `attribute` into a live producer.
    pub fn producer(&self, attribute: &Attribute) -> Result<Producer, AttributeError> {
        Producer::bind(&self.handle_for(attribute)?, attribute.clone())
    }

    /// Resolve `attribute` into a live consumer.
    pub fn consumer(&self, attribute: &Attribute) -> Result<Consumer, AttributeError> {
        Consumer::bind(&self.handle_for(attribute)?, attribute.clone())
    }

    /// Resolve both attributes, couple them, and register the coupling.
    pub fn couple(
        &self,
        source: &Attribute,
        target: &Attribute,
    ) -> Result<CouplingId, CouplingError> {
        let coupling = Coupling::new(self.producer(source)?, self.consumer(target)?)?;
        self.couplings.add(coupling)
    }

    /// Remove one coupling.
    pub fn decouple(&self, id: CouplingId) -> bool {
        self.couplings.remove(id).is_some()
    }

    /// Every getter exposed by component `id`, or nothing if it is unknown.
    pub fn potential_producers(&self, id: ComponentId) -> Vec<PotentialProducer> {
        self.component(id)
            .map(|h| attribute::potential_producers(&h))
            .unwrap_or_default()
    }

    /// Every setter exposed by component `id`, or nothing if it is unknown.
    pub fn potential_consumers(&self, id: ComponentId) -> Vec<PotentialConsumer> {
        self.component(id)
            .map(|h| attribute::potential_consumers(&h))
            .unwrap_or_default()
    }

    /// Setters anywhere in the workspace whose value type matches `producer`.
    pub fn compatible_consumers(&self, producer: &PotentialProducer) -> Vec<PotentialConsumer> {
        self.components()
            .iter()
            .flat_map(attribute::potential_consumers)
            .filter(|c| c.value_type() == producer.value_type())
            .collect()
    }

    // ── Barrier ──────────────────────────────────────────────────

    /// Run `f` while holding the lock of every current component.
    ///
    /// Locks are taken in ascending [`ComponentId`] order, so two
    /// concurrent callers cannot deadlock against each other. Calling
    /// this from inside a component update or accessor deadlocks.
    pub fn with_all_locks<R>(&self, f: impl FnOnce(&mut LockedComponents<'_>) -> R) -> R {
        let mut handles = self.components();
        handles.sort_by_key(ComponentHandle::id);
        let guards = handles.iter().map(|h| (h.id(), h.lock())).collect();
        let mut locked = LockedComponents { guards };
        f(&mut locked)
    }
}

/// Every component of a workspace, locked. See [`Workspace::with_all_locks`].
pub struct LockedComponents<'a> {
    guards: Vec<(ComponentId, MutexGuard<'a, Box<dyn Component>>)>,
}

impl LockedComponents<'_> {
    fn index(&self, id: ComponentId) -> Option<usize> {
        self.guards.binary_search_by_key(&id, |(i, _)| *i).ok()
    }

    /// Number of locked components.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if the workspace had no components.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// IDs of the locked components, ascending.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.guards.iter().map(|(id, _)| *id)
    }

    /// Borrow a locked component.
    pub fn get(&self, id: ComponentId) -> Option<&dyn Component> {
        self.index(id).map(|i| &**self.guards[i].1)
    }

    /// Borrow a locked component mutably.
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut dyn Component> {
        let i = self.index(id)?;
        Some(&mut **self.guards[i].1)
    }

    /// Borrow a locked component as its concrete type.
    pub fn downcast_ref<C: Component>(&self, id: ComponentId) -> Option<&C> {
        self.get(id)?.as_any().downcast_ref::<C>()
    }

    /// Borrow a locked component mutably as its concrete type.
    pub fn downcast_mut<C: Component>(&mut self, id: ComponentId) -> Option<&mut C> {
        self.get_mut(id)?.as_any_mut().downcast_mut::<C>()
    }
}
