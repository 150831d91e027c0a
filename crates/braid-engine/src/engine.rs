//! The update engine: driver thread, tick loop, and lifecycle.
//!
//! One tick:
//!
//! 1. Run queued tasks. Snapshot the component list.
//! 2. If the snapshot is empty, stop here: no events, tick unchanged.
//! 3. Hand an [`UpdateControls`] to the controller. The default
//!    controller updates every component on the worker pool, waits,
//!    then runs the two-phase coupling update.
//! 4. Wait for any component update the controller left running.
//! 5. Advance the tick counter, run queued tasks, queue `tick_completed`.
//!
//! A tick mutex serialises the driver loop, [`UpdateEngine::step`], and
//! task draining, so ticks never overlap and tasks never run mid-tick.
//! With `strict_event_ordering`, the wait for listener delivery happens
//! after the tick mutex is released, so listeners may call back in.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use braid_core::{panic_message, ListenerId, TickId};
use braid_coupling::{LockedComponents, Workspace};

use crate::config::{ConfigError, EngineConfig, MAX_WORKERS};
use crate::controller::{BufferedUpdate, UpdateController};
use crate::controls::UpdateControls;
use crate::metrics::{TickMetrics, TickReport};
use crate::notify::{Notification, Notifier, UpdateListener};
use crate::pool::WorkerPool;
use crate::tasks::TaskQueue;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn micros(d: Duration) -> u64 {
    d.as_micros().min(u128::from(u64::MAX)) as u64
}

/// State only touched while a tick is in progress.
struct TickState {
    controller: Box<dyn UpdateController>,
    total_component_failures: u64,
    total_coupling_failures: u64,
}

/// Everything the driver thread shares with the engine handle.
///
/// Field order matters on drop: the pool joins its workers before the
/// notifier shuts down, so late component events are still delivered.
///
/// A tick clones the pool handle under the tick mutex, so the pool is
/// only swapped between ticks.
struct EngineShared {
    workspace: Arc<Workspace>,
    config: EngineConfig,
    running: AtomicBool,
    tick: AtomicU64,
    tick_state: Mutex<TickState>,
    last_metrics: Mutex<Option<TickMetrics>>,
    tasks: TaskQueue,
    pool: Mutex<Arc<WorkerPool>>,
    notifier: Notifier,
}

impl EngineShared {
    fn current_tick(&self) -> TickId {
        TickId(self.tick.load(Ordering::Acquire))
    }

    fn run_tick(&self) -> Option<TickReport> {
        let report = {
            let mut state = lock(&self.tick_state);
            self.tick_locked(&mut state)
        };
        if report.is_some() && self.config.strict_event_ordering {
            self.notifier.flush();
        }
        self.drain_tasks_if_idle();
        report
    }

    fn tick_locked(&self, state: &mut TickState) -> Option<TickReport> {
        let start = Instant::now();
        let mut tasks_drained = self.tasks.drain(&self.workspace);

        let components = self.workspace.components();
        if components.is_empty() {
            return None;
        }

        let tick = self.current_tick().next();
        log::trace!("tick {tick} begin: {} components", components.len());

        let pool = Arc::clone(&lock(&self.pool));
        let controls = UpdateControls::new(
            &self.workspace,
            &components,
            tick,
            &pool,
            self.notifier.sink(),
        );
        let controller = state.controller.as_mut();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| controller.do_update(&controls))) {
            log::error!(
                "tick {tick}: controller '{}' panicked: {}",
                controller.name(),
                panic_message(payload.as_ref())
            );
        }
        let record = controls.finish();
        let phase_time = start.elapsed();

        self.tick.store(tick.0, Ordering::Release);
        tasks_drained += self.tasks.drain(&self.workspace);

        state.total_component_failures += record.failures.len() as u64;
        state.total_coupling_failures += record.couplings.failures.len() as u64;
        let coupling_us = micros(record.coupling_time);
        let metrics = TickMetrics {
            tick,
            total_us: micros(start.elapsed()),
            component_phase_us: micros(phase_time).saturating_sub(coupling_us),
            coupling_phase_us: coupling_us,
            components_updated: record.updated,
            components_skipped: record.skipped,
            component_failures: record.failures.len(),
            couplings_committed: record.couplings.committed,
            coupling_failures: record.couplings.failures.len(),
            tasks_drained,
            total_component_failures: state.total_component_failures,
            total_coupling_failures: state.total_coupling_failures,
        };
        log::trace!(
            "tick {tick} end: {}us, {} updated, {} couplings committed",
            metrics.total_us,
            metrics.components_updated,
            metrics.couplings_committed
        );

        *lock(&self.last_metrics) = Some(metrics.clone());
        self.notifier
            .send(Notification::TickCompleted(metrics.clone()));

        Some(TickReport {
            tick,
            metrics,
            component_failures: record.failures,
            couplings: record.couplings,
        })
    }

    /// Run queued tasks now unless a tick holds the tick mutex, in which
    /// case that tick runs them at its next boundary.
    fn drain_tasks_if_idle(&self) {
        if self.tasks.is_empty() {
            return;
        }
        let guard = match self.tick_state.try_lock() {
            Ok(g) => g,
            Err(std::sync::TryLockError::Poisoned(p)) => p.into_inner(),
            Err(std::sync::TryLockError::WouldBlock) => return,
        };
        self.tasks.drain(&self.workspace);
        drop(guard);
    }

    /// Park for up to `d`, waking early on `stop()`.
    fn pause(&self, d: Duration) {
        let deadline = Instant::now() + d;
        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }

    fn drive(&self) {
        log::debug!("driver started at tick {}", self.current_tick());
        self.notifier
            .send(Notification::EngineStarted(self.current_tick()));
        while self.running.load(Ordering::Acquire) {
            match self.run_tick() {
                Some(_) if !self.config.tick_delay.is_zero() => self.pause(self.config.tick_delay),
                Some(_) => {}
                None => self.pause(self.config.idle_interval),
            }
        }
        log::debug!("driver stopped at tick {}", self.current_tick());
        self.notifier
            .send(Notification::EngineStopped(self.current_tick()));
    }
}

/// Advances every component in a [`Workspace`] and commits its couplings,
/// one tick at a time.
///
/// While running, ticks are produced on a dedicated `braid-driver`
/// thread until [`stop`](Self::stop). While stopped, ticks can be run
/// synchronously with [`step`](Self::step). Component updates run on a
/// fixed pool of `braid-worker-N` threads; listener events are
/// delivered on `braid-notify`.
///
/// All methods take `&self`. Dropping the engine stops it and joins
/// every thread.
pub struct UpdateEngine {
    shared: Arc<EngineShared>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl UpdateEngine {
    /// Validate `config` and bring up the worker pool and notifier.
    ///
    /// The engine starts stopped, at tick 0, with [`BufferedUpdate`].
    pub fn new(workspace: Arc<Workspace>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = WorkerPool::new(config.resolved_worker_count())?;
        let notifier = Notifier::new()?;
        Ok(Self {
            shared: Arc::new(EngineShared {
                workspace,
                config,
                running: AtomicBool::new(false),
                tick: AtomicU64::new(0),
                tick_state: Mutex::new(TickState {
                    controller: Box::new(BufferedUpdate),
                    total_component_failures: 0,
                    total_coupling_failures: 0,
                }),
                last_metrics: Mutex::new(None),
                tasks: TaskQueue::new(),
                pool: Mutex::new(Arc::new(pool)),
                notifier,
            }),
            driver: Mutex::new(None),
        })
    }

    /// The workspace this engine drives.
    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.shared.workspace
    }

    /// The configuration the engine was built with.
    ///
    /// Not updated by [`set_worker_count`](Self::set_worker_count).
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        lock(&self.shared.pool).size()
    }

    /// Replace the worker pool with one of `count` threads, clamped to
    /// [`MAX_WORKERS`]. Only allowed while stopped.
    ///
    /// Waits for a `step` in progress to finish. The old workers are
    /// joined before this returns.
    pub fn set_worker_count(&self, count: usize) -> Result<(), ConfigError> {
        if count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        // Held throughout so `start` cannot race the swap.
        let _driver = lock(&self.driver);
        if self.is_running() {
            return Err(ConfigError::EngineRunning);
        }
        let count = count.min(MAX_WORKERS);
        let _state = lock(&self.shared.tick_state);
        let old = {
            let mut pool = lock(&self.shared.pool);
            if pool.size() == count {
                return Ok(());
            }
            std::mem::replace(&mut *pool, Arc::new(WorkerPool::new(count)?))
        };
        log::debug!("worker pool resized from {} to {count}", old.size());
        drop(old);
        self.shared
            .notifier
            .send(Notification::WorkerCountChanged(count));
        Ok(())
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Start ticking on the driver thread. No-op if already running.
    pub fn start(&self) -> Result<(), ConfigError> {
        let mut driver = lock(&self.driver);
        if self.shared.running.load(Ordering::Acquire) {
            return Ok(());
        }
        // A driver told to stop may still be finishing its last tick.
        if let Some(previous) = driver.take() {
            let _ = previous.join();
        }
        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("braid-driver".into())
            .spawn(move || shared.drive());
        match spawned {
            Ok(handle) => {
                *driver = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(ConfigError::ThreadSpawnFailed {
                    reason: format!("braid-driver: {e}"),
                })
            }
        }
    }

    /// Ask the driver to stop after the tick in progress. No-op if stopped.
    ///
    /// Does not wait; see [`shutdown`](Self::shutdown).
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            if let Some(handle) = lock(&self.driver).as_ref() {
                handle.thread().unpark();
            }
        }
    }

    /// Whether the driver thread is ticking.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Stop, wait for the driver thread to exit, and deliver pending
    /// listener events. Idempotent.
    pub fn shutdown(&self) {
        self.stop();
        let handle = lock(&self.driver).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("driver thread panicked");
            }
        }
        self.shared.notifier.flush();
    }

    // ── Ticking ───────────────────────────────────────────────────

    /// Number of completed ticks. Starts at 0 and never decreases.
    pub fn current_tick(&self) -> TickId {
        self.shared.current_tick()
    }

    /// Run one tick on the calling thread.
    ///
    /// Returns `None` without doing anything while the driver is running
    /// or when the workspace has no components.
    pub fn step(&self) -> Option<TickReport> {
        if self.is_running() {
            log::debug!("step ignored: engine is running");
            return None;
        }
        self.shared.run_tick()
    }

    /// Run up to `n` ticks on the calling thread, stopping early if a
    /// tick does not happen.
    pub fn step_n(&self, n: usize) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(n);
        for _ in 0..n {
            match self.step() {
                Some(r) => reports.push(r),
                None => break,
            }
        }
        reports
    }

    /// Replace the update policy. Takes effect from the next tick.
    pub fn set_controller(&self, controller: Box<dyn UpdateController>) {
        let name = controller.name().to_string();
        let mut state = lock(&self.shared.tick_state);
        log::debug!(
            "controller '{}' replaced by '{name}'",
            state.controller.name()
        );
        state.controller = controller;
        drop(state);
        self.shared
            .notifier
            .send(Notification::ControllerChanged(name));
    }

    /// Name of the current update policy.
    pub fn controller_name(&self) -> String {
        lock(&self.shared.tick_state).controller.name().to_string()
    }

    /// Metrics from the most recent completed tick.
    pub fn last_metrics(&self) -> Option<TickMetrics> {
        lock(&self.shared.last_metrics).clone()
    }

    // ── Observation and cross-thread access ───────────────────────

    /// Register a listener. It receives events produced after this call.
    pub fn add_listener(&self, listener: Box<dyn UpdateListener>) -> ListenerId {
        self.shared.notifier.add_listener(listener)
    }

    /// Unregister a listener. It receives no event produced after this
    /// call. Unknown IDs are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.shared
            .notifier
            .send(Notification::RemoveListener(id));
    }

    /// Block until every listener event queued so far has been delivered.
    pub fn flush_events(&self) {
        self.shared.notifier.flush();
    }

    /// Queue `task` to run between ticks.
    ///
    /// If no tick is in progress the task runs before this call returns;
    /// otherwise it runs when the current tick ends.
    pub fn submit_task<F>(&self, task: F)
    where
        F: FnOnce(&Workspace) + Send + 'static,
    {
        self.shared.tasks.push(Box::new(task));
        self.shared.drain_tasks_if_idle();
    }

    /// Run `f` with every component locked, in ascending ID order.
    ///
    /// See [`Workspace::with_all_locks`].
    pub fn with_all_locks<R>(&self, f: impl FnOnce(&mut LockedComponents<'_>) -> R) -> R {
        self.shared.workspace.with_all_locks(f)
    }
}

impl Drop for UpdateEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
