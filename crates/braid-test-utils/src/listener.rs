//! An [`UpdateListener`] that records everything it hears.

use std::sync::{Arc, Mutex};

use braid_core::TickId;
use braid_coupling::CouplingReport;
use braid_engine::{ComponentEvent, TickMetrics, UpdateListener, UpdateOutcome};

/// One recorded engine event.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    EngineStarted(TickId),
    EngineStopped(TickId),
    ComponentStarted(ComponentEvent),
    ComponentFinished(ComponentEvent, UpdateOutcome),
    CouplingsUpdated(TickId, CouplingReport),
    TickCompleted(TickMetrics),
    ControllerChanged(String),
    WorkerCountChanged(usize),
}

/// Records every event it receives. Clones share one record, so keep a
/// clone and register the other with the engine.
///
/// Call `UpdateEngine::flush_events` before inspecting.
#[derive(Clone, Debug, Default)]
pub struct CollectingListener {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Ticks reported by `tick_completed`, in order.
    pub fn completed_ticks(&self) -> Vec<TickId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::TickCompleted(m) => Some(m.tick),
                _ => None,
            })
            .collect()
    }

    /// `component_finished` events for `tick`, in delivery order.
    pub fn finished_in(&self, tick: TickId) -> Vec<(ComponentEvent, UpdateOutcome)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::ComponentFinished(ev, outcome) if ev.tick == tick => {
                    Some((ev, outcome))
                }
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: RecordedEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl UpdateListener for CollectingListener {
    fn engine_started(&mut self, tick: TickId) {
        self.push(RecordedEvent::EngineStarted(tick));
    }

    fn engine_stopped(&mut self, tick: TickId) {
        self.push(RecordedEvent::EngineStopped(tick));
    }

    fn component_started(&mut self, event: &ComponentEvent) {
        self.push(RecordedEvent::ComponentStarted(event.clone()));
    }

    fn component_finished(&mut self, event: &ComponentEvent, outcome: &UpdateOutcome) {
        self.push(RecordedEvent::ComponentFinished(
            event.clone(),
            outcome.clone(),
        ));
    }

    fn couplings_updated(&mut self, tick: TickId, report: &CouplingReport) {
        self.push(RecordedEvent::CouplingsUpdated(tick, report.clone()));
    }

    fn tick_completed(&mut self, metrics: &TickMetrics) {
        self.push(RecordedEvent::TickCompleted(metrics.clone()));
    }

    fn controller_changed(&mut self, name: &str) {
        self.push(RecordedEvent::ControllerChanged(name.to_string()));
    }

    fn worker_count_changed(&mut self, count: usize) {
        self.push(RecordedEvent::WorkerCountChanged(count));
    }
}
