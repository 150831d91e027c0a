//! The coupling registry and the two-phase update.
//!
//! [`CouplingManager`] owns every registered [`Coupling`] and keeps an
//! index from `(source, target)` component pairs to the couplings
//! between them, so removal and pair lookups never scan the whole set.
//!
//! Updating runs two passes over the selected couplings:
//!
//! 1. **Buffer**: every coupling reads its producer into its buffer.
//! 2. **Commit**: every coupling that buffered successfully writes the
//!    buffered value into its consumer.
//!
//! No consumer write happens before every producer read has finished,
//! so the result is independent of coupling order. A failure in either
//! pass is logged, recorded in the [`CouplingReport`], and skipped.
//!
//! Registry changes are reported to [`CouplingListener`]s, called on the
//! thread that made the change after the registry lock is released.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use braid_core::{
    panic_message, AccessError, ComponentId, CouplingError, CouplingId, CouplingIoError, IoPhase,
    ListenerId,
};
use indexmap::{IndexMap, IndexSet};

use crate::attribute::Attribute;
use crate::coupling::Coupling;

/// How [`CouplingManager::add`] treats a second coupling between the
/// same producer and consumer attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Register it alongside the first. Both run every pass.
    #[default]
    Allow,
    /// Refuse it with [`CouplingError::Duplicate`].
    Reject,
}

/// Outcome of one two-phase coupling update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CouplingReport {
    /// Couplings whose producer was read successfully.
    pub buffered: usize,
    /// Couplings whose consumer was written successfully.
    pub committed: usize,
    /// Every failed read or write, in the order they happened.
    pub failures: Vec<CouplingIoError>,
}

impl CouplingReport {
    /// Returns `true` if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: CouplingReport) {
        self.buffered += other.buffered;
        self.committed += other.committed;
        self.failures.extend(other.failures);
    }
}

/// Observer of coupling registration.
///
/// Both methods default to no-ops. A panic inside a callback is caught
/// and logged.
pub trait CouplingListener: Send + Sync {
    /// `coupling` was registered.
    fn coupling_added(&self, coupling: &Arc<Coupling>) {
        let _ = coupling;
    }

    /// `coupling` was unregistered.
    fn coupling_removed(&self, coupling: &Arc<Coupling>) {
        let _ = coupling;
    }
}

type Pair = (ComponentId, ComponentId);

#[derive(Default)]
struct Registry {
    couplings: IndexMap<CouplingId, Arc<Coupling>>,
    by_pair: HashMap<Pair, IndexSet<CouplingId>>,
    by_endpoints: HashMap<(Attribute, Attribute), usize>,
}

impl Registry {
    fn insert(&mut self, coupling: Arc<Coupling>) {
        let id = coupling.id();
        self.by_pair
            .entry((coupling.source(), coupling.target()))
            .or_default()
            .insert(id);
        let (p, c) = coupling.endpoints();
        *self.by_endpoints.entry((p.clone(), c.clone())).or_default() += 1;
        self.couplings.insert(id, coupling);
    }

    fn remove(&mut self, id: CouplingId) -> Option<Arc<Coupling>> {
        let coupling = self.couplings.swap_remove(&id)?;
        let pair = (coupling.source(), coupling.target());
        if let Some(set) = self.by_pair.get_mut(&pair) {
            set.swap_remove(&id);
            if set.is_empty() {
                self.by_pair.remove(&pair);
            }
        }
        let (p, c) = coupling.endpoints();
        let key = (p.clone(), c.clone());
        if let Some(count) = self.by_endpoints.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.by_endpoints.remove(&key);
            }
        }
        Some(coupling)
    }

    /// Couplings on every pair accepted by `keep`, pair by pair.
    fn matching(&self, keep: impl Fn(&Pair) -> bool) -> Vec<Arc<Coupling>> {
        self.by_pair
            .iter()
            .filter(|(pair, _)| keep(pair))
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.couplings.get(id).cloned())
            .collect()
    }

    fn between(&self, source: ComponentId, target: ComponentId) -> Vec<Arc<Coupling>> {
        self.by_pair
            .get(&(source, target))
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.couplings.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Registry of every coupling in a workspace.
///
/// All methods take `&self`; the registry sits behind a mutex that is
/// held only while the set is read or changed, never while couplings
/// run. Iteration follows insertion order until a removal, which moves
/// the most recently added coupling into the vacated slot.
pub struct CouplingManager {
    policy: DuplicatePolicy,
    registry: Mutex<Registry>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn CouplingListener>)>>,
    next_listener: AtomicU64,
}

impl Default for CouplingManager {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl CouplingManager {
    /// An empty registry with the given duplicate policy.
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            registry: Mutex::new(Registry::default()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// The duplicate policy in force.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        lock(&self.registry)
    }

    /// Register a coupling and return its ID.
    pub fn add(&self, coupling: Coupling) -> Result<CouplingId, CouplingError> {
        let mut registry = self.registry();
        if self.policy == DuplicatePolicy::Reject {
            let (p, c) = coupling.endpoints();
            if registry.by_endpoints.contains_key(&(p.clone(), c.clone())) {
                return Err(CouplingError::Duplicate {
                    description: coupling.description().to_string(),
                });
            }
        }
        let id = coupling.id();
        log::debug!("coupling {id} added: {}", coupling.description());
        let coupling = Arc::new(coupling);
        registry.insert(Arc::clone(&coupling));
        drop(registry);
        self.notify(|l| l.coupling_added(&coupling));
        Ok(id)
    }

    /// Unregister a coupling. Returns it if it was registered.
    ///
    /// A coupling removed while an update is running may still finish
    /// that update; it takes part in no later one.
    pub fn remove(&self, id: CouplingId) -> Option<Arc<Coupling>> {
        let removed = self.registry().remove(id);
        if let Some(c) = &removed {
            log::debug!("coupling {id} removed: {}", c.description());
            self.notify(|l| l.coupling_removed(c));
        }
        removed
    }

    /// Unregister every coupling that reads from or writes to `component`.
    pub fn remove_component(&self, component: ComponentId) -> Vec<Arc<Coupling>> {
        self.remove_matching(|(s, t)| *s == component || *t == component)
    }

    /// Unregister every coupling. Returns what was removed.
    pub fn clear(&self) -> Vec<Arc<Coupling>> {
        let removed = self.remove_matching(|_| true);
        log::debug!("cleared {} couplings", removed.len());
        removed
    }

    fn remove_matching(&self, keep: impl Fn(&Pair) -> bool) -> Vec<Arc<Coupling>> {
        let removed: Vec<Arc<Coupling>> = {
            let mut registry = self.registry();
            let ids: Vec<CouplingId> = registry.matching(keep).iter().map(|c| c.id()).collect();
            ids.into_iter()
                .filter_map(|id| registry.remove(id))
                .collect()
        };
        for c in &removed {
            self.notify(|l| l.coupling_removed(c));
        }
        removed
    }

    // ── Listeners ─────────────────────────────────────────────────

    /// Register a listener for couplings added or removed from now on.
    pub fn add_listener(&self, listener: Arc<dyn CouplingListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, listener));
        id
    }

    /// Unregister a listener. Returns `false` if `id` is unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    fn notify(&self, f: impl Fn(&dyn CouplingListener)) {
        let listeners: Vec<Arc<dyn CouplingListener>> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))) {
                log::warn!(
                    "coupling listener panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────

    /// Look up a coupling by ID.
    pub fn get(&self, id: CouplingId) -> Option<Arc<Coupling>> {
        self.registry().couplings.get(&id).cloned()
    }

    /// Whether a coupling with this ID is registered.
    pub fn contains(&self, id: CouplingId) -> bool {
        self.registry().couplings.contains_key(&id)
    }

    /// Snapshot of every registered coupling.
    pub fn all(&self) -> Vec<Arc<Coupling>> {
        self.registry().couplings.values().cloned().collect()
    }

    /// Snapshot of the couplings from `source` to `target`.
    pub fn couplings_between(
        &self,
        source: ComponentId,
        target: ComponentId,
    ) -> Vec<Arc<Coupling>> {
        self.registry().between(source, target)
    }

    /// Snapshot of the couplings whose producer is on `source`.
    pub fn outgoing(&self, source: ComponentId) -> Vec<Arc<Coupling>> {
        self.registry().matching(|(s, _)| *s == source)
    }

    /// Snapshot of the couplings whose consumer is on `target`.
    pub fn incoming(&self, target: ComponentId) -> Vec<Arc<Coupling>> {
        self.registry().matching(|(_, t)| *t == target)
    }

    /// Number of registered couplings.
    pub fn len(&self) -> usize {
        self.registry().couplings.len()
    }

    /// Returns `true` if no couplings are registered.
    pub fn is_empty(&self) -> bool {
        self.registry().couplings.is_empty()
    }

    /// Two-phase update of every registered coupling.
    ///
    /// Works on a snapshot taken up front; couplings added or removed
    /// while it runs do not affect this pass.
    pub fn update_all(&self) -> CouplingReport {
        update_couplings(&self.all())
    }

    /// Two-phase update of the couplings from `source` to `target` only.
    pub fn update_between(&self, source: ComponentId, target: ComponentId) -> CouplingReport {
        update_couplings(&self.couplings_between(source, target))
    }

    /// Two-phase update of every coupling reading from `source`.
    pub fn update_outgoing(&self, source: ComponentId) -> CouplingReport {
        update_couplings(&self.outgoing(source))
    }

    /// Two-phase update of every coupling writing to `target`.
    pub fn update_incoming(&self, target: ComponentId) -> CouplingReport {
        update_couplings(&self.incoming(target))
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run the buffer pass over `couplings`, then the commit pass over the
/// ones that buffered successfully.
pub fn update_couplings(couplings: &[Arc<Coupling>]) -> CouplingReport {
    let mut report = CouplingReport::default();
    let mut ready = Vec::with_capacity(couplings.len());

    for coupling in couplings {
        match guarded(|| coupling.set_buffer()) {
            Ok(()) => {
                report.buffered += 1;
                ready.push(coupling);
            }
            Err(source) => record(&mut report, coupling, IoPhase::Buffer, source),
        }
    }

    for coupling in ready {
        match guarded(|| coupling.commit()) {
            Ok(()) => report.committed += 1,
            Err(source) => record(&mut report, coupling, IoPhase::Commit, source),
        }
    }

    log::trace!(
        "coupling pass: {} buffered, {} committed, {} failed",
        report.buffered,
        report.committed,
        report.failures.len()
    );
    report
}

fn guarded(f: impl FnOnce() -> Result<(), AccessError>) -> Result<(), AccessError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(AccessError::failed(format!(
            "accessor panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn record(report: &mut CouplingReport, coupling: &Coupling, phase: IoPhase, source: AccessError) {
    let err = CouplingIoError {
        coupling: coupling.id(),
        description: coupling.description().to_string(),
        phase,
        source,
    };
    log::warn!("{err}");
    report.failures.push(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Consumer, Producer};
    use braid_core::{
        Component, ComponentError, ComponentHandle, MethodTable, ObjectRef, Value, ValueType,
    };

    struct Node {
        out: f64,
        input: f64,
        broken: bool,
    }

    impl Component for Node {
        fn update(&mut self) -> Result<(), ComponentError> {
            Ok(())
        }

        fn method_table(&self) -> Arc<MethodTable> {
            Arc::new(
                MethodTable::builder::<Node>()
                    .getter(ObjectRef::ROOT_KIND, "out", ValueType::Scalar, &[], |n, _, _| {
                        if n.broken {
                            Err(AccessError::failed("broken"))
                        } else {
                            Ok(Value::Scalar(n.out))
                        }
                    })
                    .scalar_setter("out", |n, v| n.out = v)
                    .scalar_setter("input", |n, v| n.input = v)
                    .getter(ObjectRef::ROOT_KIND, "boom", ValueType::Scalar, &[], |_, _, _| {
                        panic!("getter exploded")
                    })
                    .build(),
            )
        }
    }

    fn node(id: u64, out: f64) -> ComponentHandle {
        ComponentHandle::new(
            ComponentId(id),
            format!("n{id}"),
            Box::new(Node {
                out,
                input: 0.0,
                broken: false,
            }),
        )
    }

    fn couple(src: &ComponentHandle, get: &str, dst: &ComponentHandle, set: &str) -> Coupling {
        let p = Producer::bind(src, Attribute::new(src.id(), get, ValueType::Scalar)).unwrap();
        let c = Consumer::bind(dst, Attribute::new(dst.id(), set, ValueType::Scalar)).unwrap();
        Coupling::new(p, c).unwrap()
    }

    fn input(h: &ComponentHandle) -> f64 {
        h.downcast::<Node, _>(|n| n.input).unwrap()
    }

    fn out(h: &ComponentHandle) -> f64 {
        h.downcast::<Node, _>(|n| n.out).unwrap()
    }

    // ── Registry ─────────────────────────────────────────────────

    #[test]
    fn add_get_remove() {
        let (a, b) = (node(1, 1.0), node(2, 0.0));
        let m = CouplingManager::default();
        let id = m.add(couple(&a, "out", &b, "input")).unwrap();
        assert_eq!(m.len(), 1);
        assert!(m.contains(id));
        assert_eq!(m.couplings_between(ComponentId(1), ComponentId(2)).len(), 1);
        assert!(m.couplings_between(b.id(), a.id()).is_empty());

        let removed = m.remove(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(m.is_empty());
        assert!(m.couplings_between(a.id(), b.id()).is_empty());
        assert!(m.remove(id).is_none());
    }

    #[test]
    fn duplicates_allowed_by_default() {
        let (a, b) = (node(1, 1.0), node(2, 0.0));
        let m = CouplingManager::default();
        m.add(couple(&a, "out", &b, "input")).unwrap();
        m.add(couple(&a, "out", &b, "input")).unwrap();
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn reject_policy_refuses_duplicates() {
        let (a, b) = (node(1, 1.0), node(2, 0.0));
        let m = CouplingManager::new(DuplicatePolicy::Reject);
        let first = m.add(couple(&a, "out", &b, "input")).unwrap();
        let err = m.add(couple(&a, "out", &b, "input")).unwrap_err();
        assert!(matches!(err, CouplingError::Duplicate { .. }));

        m.remove(first);
        m.add(couple(&a, "out", &b, "input")).unwrap();
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn remove_component_drops_both_directions() {
        let (a, b, c) = (node(1, 1.0), node(2, 2.0), node(3, 3.0));
        let m = CouplingManager::default();
        m.add(couple(&a, "out", &b, "input")).unwrap();
        m.add(couple(&b, "out", &c, "input")).unwrap();
        let keep = m.add(couple(&a, "out", &c, "input")).unwrap();

        let removed = m.remove_component(ComponentId(2));
        assert_eq!(removed.len(), 2);
        assert_eq!(m.len(), 1);
        assert!(m.contains(keep));
    }

    #[test]
    fn outgoing_and_incoming_follow_direction() {
        let (a, b, c) = (node(1, 1.0), node(2, 2.0), node(3, 3.0));
        let m = CouplingManager::default();
        let ab = m.add(couple(&a, "out", &b, "input")).unwrap();
        let ac = m.add(couple(&a, "out", &c, "input")).unwrap();
        let cb = m.add(couple(&c, "out", &b, "input")).unwrap();

        let ids = |cs: Vec<Arc<Coupling>>| {
            let mut ids: Vec<CouplingId> = cs.iter().map(|c| c.id()).collect();
            ids.sort();
            ids
        };
        assert_eq!(ids(m.outgoing(ComponentId(1))), [ab, ac]);
        assert_eq!(ids(m.incoming(ComponentId(2))), [ab, cb]);
        assert!(m.incoming(ComponentId(1)).is_empty());
        assert!(m.outgoing(ComponentId(2)).is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let (a, b) = (node(1, 1.0), node(2, 2.0));
        let m = CouplingManager::default();
        m.add(couple(&a, "out", &b, "input")).unwrap();
        m.add(couple(&b, "out", &a, "input")).unwrap();

        assert_eq!(m.clear().len(), 2);
        assert!(m.is_empty());
        assert!(m.outgoing(ComponentId(1)).is_empty());
        assert!(m.clear().is_empty());
    }

    // ── Listeners ────────────────────────────────────────────────

    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl Journal {
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl CouplingListener for Journal {
        fn coupling_added(&self, coupling: &Arc<Coupling>) {
            self.0.lock().unwrap().push(format!("+{}", coupling.id()));
        }

        fn coupling_removed(&self, coupling: &Arc<Coupling>) {
            self.0.lock().unwrap().push(format!("-{}", coupling.id()));
        }
    }

    struct Panicky;

    impl CouplingListener for Panicky {
        fn coupling_added(&self, _: &Arc<Coupling>) {
            panic!("listener exploded");
        }
    }

    #[test]
    fn listeners_see_adds_and_removes() {
        let (a, b, c) = (node(1, 1.0), node(2, 2.0), node(3, 3.0));
        let m = CouplingManager::default();
        let journal = Arc::new(Journal::default());
        m.add_listener(Arc::new(Panicky));
        m.add_listener(journal.clone());

        let ab = m.add(couple(&a, "out", &b, "input")).unwrap();
        let bc = m.add(couple(&b, "out", &c, "input")).unwrap();
        let ca = m.add(couple(&c, "out", &a, "input")).unwrap();
        m.remove(ab);
        m.remove_component(ComponentId(3));
        assert!(m.is_empty());

        let entries = journal.entries();
        let added = [ab, bc, ca].map(|id| format!("+{id}"));
        assert_eq!(entries[..3], added);
        assert_eq!(entries[3], format!("-{ab}"));
        let mut rest = entries[4..].to_vec();
        rest.sort();
        let mut expected = vec![format!("-{bc}"), format!("-{ca}")];
        expected.sort();
        assert_eq!(rest, expected);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let (a, b) = (node(1, 1.0), node(2, 2.0));
        let m = CouplingManager::default();
        let journal = Arc::new(Journal::default());
        let id = m.add_listener(journal.clone());
        let first = m.add(couple(&a, "out", &b, "input")).unwrap();

        assert!(m.remove_listener(id));
        assert!(!m.remove_listener(id));
        m.add(couple(&b, "out", &a, "input")).unwrap();
        m.clear();
        assert_eq!(journal.entries(), [format!("+{first}")]);
    }

    #[test]
    fn rejected_duplicate_is_not_announced() {
        let (a, b) = (node(1, 1.0), node(2, 2.0));
        let m = CouplingManager::new(DuplicatePolicy::Reject);
        let journal = Arc::new(Journal::default());
        m.add_listener(journal.clone());
        m.add(couple(&a, "out", &b, "input")).unwrap();
        assert!(m.add(couple(&a, "out", &b, "input")).is_err());
        assert_eq!(journal.entries().len(), 1);
    }

    // ── Two-phase update ─────────────────────────────────────────

    #[test]
    fn swap_reads_before_writes() {
        let (a, b) = (node(1, 1.0), node(2, 2.0));
        let m = CouplingManager::default();
        m.add(couple(&a, "out", &b, "out")).unwrap();
        m.add(couple(&b, "out", &a, "out")).unwrap();
        let report = m.update_all();
        assert!(report.is_clean());
        assert_eq!(report.committed, 2);
        assert_eq!(out(&a), 2.0);
        assert_eq!(out(&b), 1.0);
    }

    #[test]
    fn failed_buffer_is_not_committed_and_others_continue() {
        let (a, b, c) = (node(1, 1.0), node(2, 2.0), node(3, 0.0));
        a.downcast_mut::<Node, _>(|n| n.broken = true);
        let m = CouplingManager::default();
        m.add(couple(&a, "out", &c, "input")).unwrap();
        m.add(couple(&b, "out", &b, "input")).unwrap();

        let report = m.update_all();
        assert_eq!(report.buffered, 1);
        assert_eq!(report.committed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].phase, IoPhase::Buffer);
        assert_eq!(input(&c), 0.0);
        assert_eq!(input(&b), 2.0);
    }

    #[test]
    fn panicking_accessor_becomes_failure() {
        let (a, b) = (node(1, 1.0), node(2, 0.0));
        let m = CouplingManager::default();
        m.add(couple(&a, "boom", &b, "input")).unwrap();
        m.add(couple(&a, "out", &b, "input")).unwrap();
        let report = m.update_all();
        assert_eq!(report.failures.len(), 1);
        let message = report.failures[0].source.to_string();
        assert!(message.contains("getter exploded"));
        assert_eq!(input(&b), 1.0);
    }

    #[test]
    fn update_between_touches_only_that_pair() {
        let (a, b, c) = (node(1, 5.0), node(2, 0.0), node(3, 0.0));
        let m = CouplingManager::default();
        m.add(couple(&a, "out", &b, "input")).unwrap();
        m.add(couple(&a, "out", &c, "input")).unwrap();
        let report = m.update_between(ComponentId(1), ComponentId(3));
        assert_eq!(report.committed, 1);
        assert_eq!(input(&b), 0.0);
        assert_eq!(input(&c), 5.0);
    }

    #[test]
    fn update_outgoing_and_incoming() {
        let (a, b, c) = (node(1, 5.0), node(2, 7.0), node(3, 0.0));
        let m = CouplingManager::default();
        m.add(couple(&a, "out", &b, "input")).unwrap();
        m.add(couple(&a, "out", &c, "input")).unwrap();
        m.add(couple(&b, "out", &c, "out")).unwrap();

        let report = m.update_outgoing(ComponentId(1));
        assert_eq!(report.committed, 2);
        assert_eq!(input(&b), 5.0);
        assert_eq!(input(&c), 5.0);
        assert_eq!(out(&c), 0.0);

        let report = m.update_incoming(ComponentId(3));
        assert_eq!(report.committed, 2);
        assert_eq!(out(&c), 7.0);
    }

    #[test]
    fn empty_update_is_clean() {
        let report = CouplingManager::default().update_all();
        assert_eq!(report, CouplingReport::default());
    }

    #[test]
    fn report_merge_accumulates() {
        let mut a = CouplingReport {
            buffered: 2,
            committed: 1,
            failures: Vec::new(),
        };
        a.merge(CouplingReport {
            buffered: 3,
            committed: 3,
            failures: Vec::new(),
        });
        assert_eq!(a.buffered, 5);
        assert_eq!(a.committed, 4);
    }
}
