//! Listener events and the notifier thread.
//!
//! Engine threads never call listeners directly. Every event is queued
//! on a channel and delivered, in order, by one dedicated thread
//! (`braid-notify`), so a slow or panicking listener can delay other
//! listeners but never a tick.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use braid_core::{panic_message, ComponentError, ComponentId, ListenerId, TickId, WorkerId};
use braid_coupling::CouplingReport;
use crossbeam_channel::{Receiver, Sender};

use crate::config::ConfigError;
use crate::metrics::TickMetrics;

/// Identity of one component update, carried by the per-component events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentEvent {
    /// The tick being computed.
    pub tick: TickId,
    /// The component being updated.
    pub component: ComponentId,
    /// Its display name.
    pub name: String,
    /// The thread running the update.
    pub worker: WorkerId,
}

/// Result of one component update.
pub type UpdateOutcome = Result<(), ComponentError>;

/// Observer of engine progress.
///
/// Every method has a no-op default. All calls come from the notifier
/// thread, in the order the engine produced them.
///
/// A listener may call back into the engine, including `step`,
/// `set_controller` and `flush_events`. It must not call `shutdown` or
/// drop the last handle to the engine: both wait for threads that may
/// be waiting on this one.
pub trait UpdateListener: Send + 'static {
    /// The driver thread started; `tick` is the current tick.
    fn engine_started(&mut self, tick: TickId) {
        let _ = tick;
    }

    /// The driver thread stopped after finishing `tick`.
    fn engine_stopped(&mut self, tick: TickId) {
        let _ = tick;
    }

    /// A component update is about to run.
    fn component_started(&mut self, event: &ComponentEvent) {
        let _ = event;
    }

    /// A component update returned or panicked.
    fn component_finished(&mut self, event: &ComponentEvent, outcome: &UpdateOutcome) {
        let _ = (event, outcome);
    }

    /// A coupling pass finished during `tick`.
    fn couplings_updated(&mut self, tick: TickId, report: &CouplingReport) {
        let _ = (tick, report);
    }

    /// A tick completed and the tick counter now reads `metrics.tick`.
    fn tick_completed(&mut self, metrics: &TickMetrics) {
        let _ = metrics;
    }

    /// The update policy was replaced by one called `name`.
    fn controller_changed(&mut self, name: &str) {
        let _ = name;
    }

    /// The worker pool was rebuilt with `count` threads.
    fn worker_count_changed(&mut self, count: usize) {
        let _ = count;
    }
}

pub(crate) enum Notification {
    EngineStarted(TickId),
    EngineStopped(TickId),
    ComponentStarted(ComponentEvent),
    ComponentFinished(ComponentEvent, UpdateOutcome),
    CouplingsUpdated(TickId, CouplingReport),
    TickCompleted(TickMetrics),
    ControllerChanged(String),
    WorkerCountChanged(usize),
    AddListener(ListenerId, Box<dyn UpdateListener>),
    RemoveListener(ListenerId),
    Flush(Sender<()>),
    Shutdown,
}

/// Cloneable sending side, handed to jobs running on worker threads.
#[derive(Clone)]
pub(crate) struct EventSink {
    tx: Sender<Notification>,
}

impl EventSink {
    /// Queue an event. Dropped silently once the notifier has shut down.
    pub fn send(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

/// Owns the `braid-notify` thread.
pub(crate) struct Notifier {
    sink: EventSink,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
    next_listener: AtomicU64,
}

impl Notifier {
    pub fn new() -> Result<Self, ConfigError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("braid-notify".into())
            .spawn(move || deliver(rx))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("braid-notify: {e}"),
            })?;
        Ok(Self {
            sink: EventSink { tx },
            thread_id: thread.thread().id(),
            thread: Some(thread),
            next_listener: AtomicU64::new(1),
        })
    }

    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    pub fn send(&self, notification: Notification) {
        self.sink.send(notification);
    }

    /// Queue `listener` for registration and return its handle.
    pub fn add_listener(&self, listener: Box<dyn UpdateListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.send(Notification::AddListener(id, listener));
        id
    }

    /// Block until every event queued before this call has been delivered.
    ///
    /// Returns at once on the notifier thread itself, where every earlier
    /// event has already been handed out.
    pub fn flush(&self) {
        if thread::current().id() == self.thread_id {
            return;
        }
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.send(Notification::Flush(tx));
        let _ = rx.recv();
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.send(Notification::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn deliver(rx: Receiver<Notification>) {
    let mut listeners: Vec<(ListenerId, Box<dyn UpdateListener>)> = Vec::new();
    for notification in rx.iter() {
        match notification {
            Notification::AddListener(id, listener) => listeners.push((id, listener)),
            Notification::RemoveListener(id) => {
                let before = listeners.len();
                listeners.retain(|(l, _)| *l != id);
                if listeners.len() == before {
                    log::debug!("remove {id}: not registered");
                }
            }
            Notification::Flush(done) => {
                let _ = done.send(());
            }
            Notification::Shutdown => break,
            event => {
                for (_, listener) in &mut listeners {
                    let listener = listener.as_mut();
                    let result = catch_unwind(AssertUnwindSafe(|| dispatch(listener, &event)));
                    if let Err(payload) = result {
                        log::warn!("listener panicked: {}", panic_message(payload.as_ref()));
                    }
                }
            }
        }
    }
}

fn dispatch(listener: &mut dyn UpdateListener, event: &Notification) {
    match event {
        Notification::EngineStarted(tick) => listener.engine_started(*tick),
        Notification::EngineStopped(tick) => listener.engine_stopped(*tick),
        Notification::ComponentStarted(e) => listener.component_started(e),
        Notification::ComponentFinished(e, outcome) => listener.component_finished(e, outcome),
        Notification::CouplingsUpdated(tick, report) => listener.couplings_updated(*tick, report),
        Notification::TickCompleted(metrics) => listener.tick_completed(metrics),
        Notification::ControllerChanged(name) => listener.controller_changed(name),
        Notification::WorkerCountChanged(count) => listener.worker_count_changed(*count),
        Notification::AddListener(..)
        | Notification::RemoveListener(_)
        | Notification::Flush(_)
        | Notification::Shutdown => {}
    }
}
