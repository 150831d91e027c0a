//! The per-tick capability handed to an [`UpdateController`](crate::UpdateController).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use braid_core::{ComponentError, ComponentHandle, ComponentId, TickId, WorkerId};
use braid_coupling::{CouplingReport, Workspace};

use crate::latch::{Completion, CountdownLatch};
use crate::notify::{ComponentEvent, EventSink, Notification, UpdateOutcome};
use crate::pool::WorkerPool;

/// Outcomes accumulated over one tick, shared with worker jobs.
#[derive(Debug, Default)]
pub(crate) struct TickRecord {
    pub updated: usize,
    pub skipped: usize,
    pub failures: Vec<(ComponentId, ComponentError)>,
    pub couplings: CouplingReport,
    pub coupling_time: Duration,
}

fn record(record: &Mutex<TickRecord>) -> MutexGuard<'_, TickRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a controller may do during one tick.
///
/// Component updates go to the worker pool and return immediately;
/// coupling passes run on the calling (driver) thread. However the
/// controller orders things, the engine waits for every update it
/// submitted before the tick counter advances.
pub struct UpdateControls<'a> {
    workspace: &'a Workspace,
    components: &'a [ComponentHandle],
    tick: TickId,
    pool: &'a WorkerPool,
    events: EventSink,
    in_flight: Arc<CountdownLatch>,
    record: Arc<Mutex<TickRecord>>,
}

impl<'a> UpdateControls<'a> {
    pub(crate) fn new(
        workspace: &'a Workspace,
        components: &'a [ComponentHandle],
        tick: TickId,
        pool: &'a WorkerPool,
        events: EventSink,
    ) -> Self {
        Self {
            workspace,
            components,
            tick,
            pool,
            events,
            in_flight: Arc::new(CountdownLatch::new(0)),
            record: Arc::new(Mutex::new(TickRecord::default())),
        }
    }

    /// The workspace being updated.
    pub fn workspace(&self) -> &Workspace {
        self.workspace
    }

    /// Components captured at the start of this tick, in workspace order.
    ///
    /// Components added during the tick are not in this list; removed
    /// ones still are.
    pub fn components(&self) -> &[ComponentHandle] {
        self.components
    }

    /// The tick being computed.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Submit one component update to the worker pool.
    ///
    /// A disabled component is skipped and its completion is already
    /// done.
    pub fn update_component(&self, handle: &ComponentHandle) -> Completion {
        let (signal, completion) = Completion::pair();
        self.dispatch(handle, signal);
        completion
    }

    /// Update `handles` in parallel and block until all have finished.
    pub fn update_components(&self, handles: &[ComponentHandle]) {
        let latch = Arc::new(CountdownLatch::new(handles.len()));
        for handle in handles {
            self.dispatch(handle, latch.guard());
        }
        latch.wait();
    }

    /// Block until every update submitted so far has finished.
    pub fn wait_idle(&self) {
        self.in_flight.wait();
    }

    /// Two-phase update of every coupling in the workspace.
    pub fn update_couplings(&self) -> CouplingReport {
        let start = Instant::now();
        let report = self.workspace.couplings().update_all();
        self.finish_couplings(start, &report);
        report
    }

    /// Two-phase update of the couplings from `source` to `target`.
    pub fn update_couplings_between(
        &self,
        source: ComponentId,
        target: ComponentId,
    ) -> CouplingReport {
        let start = Instant::now();
        let report = self.workspace.couplings().update_between(source, target);
        self.finish_couplings(start, &report);
        report
    }

    /// Two-phase update of every coupling reading from `source`.
    pub fn update_outgoing_couplings(&self, source: ComponentId) -> CouplingReport {
        let start = Instant::now();
        let report = self.workspace.couplings().update_outgoing(source);
        self.finish_couplings(start, &report);
        report
    }

    /// Two-phase update of every coupling writing to `target`.
    pub fn update_incoming_couplings(&self, target: ComponentId) -> CouplingReport {
        let start = Instant::now();
        let report = self.workspace.couplings().update_incoming(target);
        self.finish_couplings(start, &report);
        report
    }

    fn finish_couplings(&self, start: Instant, report: &CouplingReport) {
        {
            let mut rec = record(&self.record);
            rec.coupling_time += start.elapsed();
            rec.couplings.merge(report.clone());
        }
        self.events
            .send(Notification::CouplingsUpdated(self.tick, report.clone()));
    }

    /// Queue `handle` on the pool. `token` is dropped once the update
    /// has finished, or immediately if the component is disabled.
    fn dispatch<T: Send + 'static>(&self, handle: &ComponentHandle, token: T) {
        if !handle.is_enabled() {
            record(&self.record).skipped += 1;
            log::trace!("tick {}: {handle} disabled, skipped", self.tick);
            return;
        }
        let in_flight = self.in_flight.enter();
        let handle = handle.clone();
        let tick = self.tick;
        let events = self.events.clone();
        let rec = Arc::clone(&self.record);
        self.pool.execute(Box::new(move |worker: WorkerId| {
            run_component(&handle, tick, worker, &events, &rec);
            drop(token);
            drop(in_flight);
        }));
    }

    /// Consume the controls and return what the tick recorded.
    ///
    /// Waits for outstanding updates first.
    pub(crate) fn finish(self) -> TickRecord {
        self.wait_idle();
        let mut rec = record(&self.record);
        std::mem::take(&mut *rec)
    }
}

fn run_component(
    handle: &ComponentHandle,
    tick: TickId,
    worker: WorkerId,
    events: &EventSink,
    rec: &Mutex<TickRecord>,
) {
    let event = ComponentEvent {
        tick,
        component: handle.id(),
        name: handle.name().to_string(),
        worker,
    };
    events.send(Notification::ComponentStarted(event.clone()));

    let outcome: UpdateOutcome = {
        let mut guard = handle.lock();
        catch_unwind(AssertUnwindSafe(|| guard.update()))
            .unwrap_or_else(|payload| Err(ComponentError::from_panic(payload.as_ref())))
    };

    {
        let mut rec = record(rec);
        rec.updated += 1;
        if let Err(e) = &outcome {
            log::warn!("tick {tick}: {handle} on {worker}: {e}");
            rec.failures.push((handle.id(), e.clone()));
        }
    }
    events.send(Notification::ComponentFinished(event, outcome));
}
