//! Pluggable per-tick update policies.
//!
//! The engine calls [`UpdateController::do_update`] once per tick with
//! an [`UpdateControls`] for that tick. The controller decides in what
//! order and with how much parallelism components and couplings are
//! updated.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use braid_core::{ComponentHandle, ComponentId};

use crate::controls::UpdateControls;

/// Per-tick update policy.
pub trait UpdateController: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Run one tick's worth of updates.
    fn do_update(&mut self, controls: &UpdateControls<'_>);
}

// ── BufferedUpdate ────────────────────────────────────────────────

/// Default policy: every component in parallel, wait, then every coupling.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufferedUpdate;

impl UpdateController for BufferedUpdate {
    fn name(&self) -> &str {
        "buffered"
    }

    fn do_update(&mut self, controls: &UpdateControls<'_>) {
        controls.update_components(controls.components());
        controls.update_couplings();
    }
}

// ── SerialUpdate ──────────────────────────────────────────────────

/// One component at a time in workspace order, then every coupling.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialUpdate;

impl UpdateController for SerialUpdate {
    fn name(&self) -> &str {
        "serial"
    }

    fn do_update(&mut self, controls: &UpdateControls<'_>) {
        for handle in controls.components() {
            controls.update_component(handle).wait();
        }
        controls.update_couplings();
    }
}

// ── PriorityUpdate ────────────────────────────────────────────────

/// Components grouped by ascending priority. Each group runs in
/// parallel and finishes before the next starts; couplings run last.
///
/// Components without an explicit priority get the default (0).
#[derive(Clone, Debug, Default)]
pub struct PriorityUpdate {
    priorities: HashMap<ComponentId, i32>,
    default_priority: i32,
}

impl PriorityUpdate {
    /// Every component at priority 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority of one component. Lower runs earlier.
    pub fn with_priority(mut self, component: ComponentId, priority: i32) -> Self {
        self.priorities.insert(component, priority);
        self
    }

    /// Priority for components not listed explicitly.
    pub fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }

    /// Change the priority of one component.
    pub fn set_priority(&mut self, component: ComponentId, priority: i32) {
        self.priorities.insert(component, priority);
    }

    /// The priority `component` will run at.
    pub fn priority(&self, component: ComponentId) -> i32 {
        self.priorities
            .get(&component)
            .copied()
            .unwrap_or(self.default_priority)
    }

    fn groups(&self, components: &[ComponentHandle]) -> BTreeMap<i32, Vec<ComponentHandle>> {
        let mut groups: BTreeMap<i32, Vec<ComponentHandle>> = BTreeMap::new();
        for handle in components {
            groups
                .entry(self.priority(handle.id()))
                .or_default()
                .push(handle.clone());
        }
        groups
    }
}

impl UpdateController for PriorityUpdate {
    fn name(&self) -> &str {
        "priority"
    }

    fn do_update(&mut self, controls: &UpdateControls<'_>) {
        for (priority, group) in self.groups(controls.components()) {
            log::trace!(
                "tick {}: priority {priority}, {} components",
                controls.tick(),
                group.len()
            );
            controls.update_components(&group);
        }
        controls.update_couplings();
    }
}

// ── ActionSequence ────────────────────────────────────────────────

/// One step of an [`ActionSequence`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateAction {
    /// Every component in parallel, then wait.
    UpdateAllComponents,
    /// One component, then wait. Skipped if it is not in the tick's snapshot.
    UpdateComponent(ComponentId),
    /// Every coupling.
    UpdateCouplings,
    /// The couplings from the first component to the second.
    UpdateCouplingsBetween(ComponentId, ComponentId),
    /// The couplings reading from one component.
    UpdateOutgoingCouplings(ComponentId),
    /// The couplings writing to one component.
    UpdateIncomingCouplings(ComponentId),
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateAllComponents => write!(f, "update all components"),
            Self::UpdateComponent(id) => write!(f, "update component #{id}"),
            Self::UpdateCouplings => write!(f, "update couplings"),
            Self::UpdateCouplingsBetween(s, t) => write!(f, "update couplings #{s} -> #{t}"),
            Self::UpdateOutgoingCouplings(s) => write!(f, "update couplings from #{s}"),
            Self::UpdateIncomingCouplings(t) => write!(f, "update couplings into #{t}"),
        }
    }
}

/// A scripted list of actions run in order every tick.
///
/// The default sequence is `[UpdateAllComponents, UpdateCouplings]`,
/// which behaves like [`BufferedUpdate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionSequence {
    actions: Vec<UpdateAction>,
}

impl Default for ActionSequence {
    fn default() -> Self {
        Self::new(vec![
            UpdateAction::UpdateAllComponents,
            UpdateAction::UpdateCouplings,
        ])
    }
}

impl ActionSequence {
    /// A sequence running `actions` in order.
    pub fn new(actions: Vec<UpdateAction>) -> Self {
        Self { actions }
    }

    /// Append an action.
    pub fn push(&mut self, action: UpdateAction) {
        self.actions.push(action);
    }

    /// Remove the action at `index`.
    pub fn remove(&mut self, index: usize) -> Option<UpdateAction> {
        (index < self.actions.len()).then(|| self.actions.remove(index))
    }

    /// Move the action at `from` to position `to`.
    ///
    /// Out-of-range indices leave the sequence unchanged.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from < self.actions.len() && to < self.actions.len() {
            let action = self.actions.remove(from);
            self.actions.insert(to, action);
        }
    }

    /// The actions, in run order.
    pub fn actions(&self) -> &[UpdateAction] {
        &self.actions
    }

    fn run(action: UpdateAction, controls: &UpdateControls<'_>) {
        match action {
            UpdateAction::UpdateAllComponents => controls.update_components(controls.components()),
            UpdateAction::UpdateComponent(id) => {
                match controls.components().iter().find(|h| h.id() == id) {
                    Some(handle) => controls.update_component(handle).wait(),
                    None => log::debug!("tick {}: {action}: no such component", controls.tick()),
                }
            }
            UpdateAction::UpdateCouplings => {
                controls.update_couplings();
            }
            UpdateAction::UpdateCouplingsBetween(source, target) => {
                controls.update_couplings_between(source, target);
            }
            UpdateAction::UpdateOutgoingCouplings(source) => {
                controls.update_outgoing_couplings(source);
            }
            UpdateAction::UpdateIncomingCouplings(target) => {
                controls.update_incoming_couplings(target);
            }
        }
    }
}

impl UpdateController for ActionSequence {
    fn name(&self) -> &str {
        "action-sequence"
    }

    fn do_update(&mut self, controls: &UpdateControls<'_>) {
        for &action in &self.actions {
            Self::run(action, controls);
        }
    }
}
