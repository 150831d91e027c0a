//! Integration test: tick counting, start/stop, and listener events.
//!
//! Drives a small workspace both synchronously with `step` and on the
//! driver thread, checking that ticks are monotonic, that an empty
//! workspace never ticks, and that listeners see every phase of a tick
//! in order.

use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use braid_core::{Component, ComponentError, ComponentId, MethodTable, TickId, WorkerId};
use braid_coupling::Workspace;
use braid_engine::{
    ConfigError, EngineConfig, SerialUpdate, TickMetrics, UpdateEngine, UpdateListener,
};
use braid_test_utils::{
    engine, engine_with, scalar, Accumulator, CollectingListener, RecordedEvent, Slow,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

fn ticks(range: std::ops::RangeInclusive<u64>) -> Vec<TickId> {
    range.map(TickId).collect()
}

// ── Synchronous stepping ─────────────────────────────────────────

#[test]
fn step_advances_by_one() {
    let e = engine(2);
    let acc = e
        .workspace()
        .add_component("acc", Accumulator::new(0.0).with_increment(1.0));
    assert_eq!(e.current_tick(), TickId(0));

    let reports = e.step_n(10);
    assert_eq!(reports.len(), 10);
    for (i, r) in reports.iter().enumerate() {
        assert_eq!(r.tick, TickId(i as u64 + 1));
        assert!(r.is_clean());
    }
    assert_eq!(e.current_tick(), TickId(10));
    assert_eq!(acc.downcast::<Accumulator, _>(|a| a.value), Some(10.0));
}

#[test]
fn empty_workspace_never_ticks() {
    let e = engine(2);
    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));

    assert!(e.step().is_none());
    assert!(e.step_n(5).is_empty());
    e.flush_events();
    assert_eq!(e.current_tick(), TickId(0));
    assert!(e.last_metrics().is_none());
    assert!(listener.events().is_empty());
}

#[test]
fn running_empty_workspace_only_reports_lifecycle() {
    let e = engine_with(EngineConfig {
        worker_count: Some(1),
        idle_interval: Duration::from_millis(1),
        ..EngineConfig::default()
    });
    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));

    e.start().unwrap();
    thread::sleep(Duration::from_millis(20));
    e.shutdown();

    assert_eq!(e.current_tick(), TickId(0));
    assert_eq!(
        listener.events(),
        vec![
            RecordedEvent::EngineStarted(TickId(0)),
            RecordedEvent::EngineStopped(TickId(0)),
        ]
    );
}

/// Adds a component to its own workspace on its first update.
struct Spawner {
    workspace: Weak<Workspace>,
    spawned: Option<ComponentId>,
}

impl Component for Spawner {
    fn update(&mut self) -> Result<(), ComponentError> {
        if self.spawned.is_none() {
            if let Some(ws) = self.workspace.upgrade() {
                let late = ws.add_component("late", Accumulator::new(0.0).with_increment(1.0));
                self.spawned = Some(late.id());
            }
        }
        Ok(())
    }

    fn method_table(&self) -> Arc<MethodTable> {
        Arc::new(MethodTable::empty())
    }
}

#[test]
fn component_added_mid_tick_waits_for_next_tick() {
    let e = engine(2);
    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));
    e.workspace().add_component(
        "spawner",
        Spawner {
            workspace: Arc::downgrade(e.workspace()),
            spawned: None,
        },
    );

    let first = e.step().unwrap();
    assert_eq!(first.metrics.components_updated, 1);
    assert_eq!(e.workspace().component_count(), 2);
    let late = e.workspace().component_by_name("late").unwrap();
    assert_eq!(late.downcast::<Accumulator, _>(|a| a.updates), Some(0));

    let second = e.step().unwrap();
    assert_eq!(second.metrics.components_updated, 2);
    assert_eq!(late.downcast::<Accumulator, _>(|a| a.updates), Some(1));
    assert_eq!(e.workspace().component_count(), 2);

    e.flush_events();
    assert_eq!(listener.finished_in(TickId(1)).len(), 1);
    assert!(listener
        .finished_in(TickId(2))
        .iter()
        .any(|(ev, _)| ev.component == late.id()));
}

// ── Driver thread ────────────────────────────────────────────────

#[test]
fn driver_ticks_until_stopped() {
    let e = engine(2);
    e.workspace().add_component("a", Accumulator::new(0.0));
    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));

    e.start().unwrap();
    assert!(e.is_running());
    assert!(
        e.step().is_none(),
        "step must not run while the driver does"
    );
    assert!(wait_until(|| e.current_tick().0 >= 5));
    e.shutdown();
    assert!(!e.is_running());

    let stopped_at = e.current_tick();
    thread::sleep(Duration::from_millis(10));
    assert_eq!(e.current_tick(), stopped_at);
    assert_eq!(listener.completed_ticks(), ticks(1..=stopped_at.0));
}

#[test]
fn restart_continues_the_count() {
    let e = engine(1);
    e.workspace().add_component("a", Accumulator::new(0.0));
    e.step_n(3);

    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));
    e.start().unwrap();
    assert!(wait_until(|| e.current_tick().0 >= 6));
    e.stop();
    e.start().unwrap();
    assert!(wait_until(|| e.current_tick().0 >= 9));
    e.shutdown();

    let completed = listener.completed_ticks();
    assert_eq!(completed.first(), Some(&TickId(4)));
    assert_eq!(completed, ticks(4..=e.current_tick().0));

    let lifecycle: Vec<_> = listener
        .events()
        .into_iter()
        .filter(|ev| {
            matches!(
                ev,
                RecordedEvent::EngineStarted(_) | RecordedEvent::EngineStopped(_)
            )
        })
        .collect();
    assert_eq!(lifecycle.len(), 4);
    assert_eq!(lifecycle[0], RecordedEvent::EngineStarted(TickId(3)));
}

#[test]
fn stop_interrupts_tick_delay() {
    let e = engine_with(EngineConfig {
        worker_count: Some(1),
        tick_delay: Duration::from_secs(30),
        ..EngineConfig::default()
    });
    e.workspace().add_component("a", Accumulator::new(0.0));

    e.start().unwrap();
    assert!(wait_until(|| e.current_tick().0 >= 1));
    let begun = Instant::now();
    e.shutdown();
    assert!(begun.elapsed() < TIMEOUT);
    assert_eq!(e.current_tick(), TickId(1));
}

// ── Listener events ──────────────────────────────────────────────

#[test]
fn events_follow_tick_phases() {
    let e = engine(3);
    let ws = e.workspace();
    let a = ws.add_component("a", Accumulator::new(1.0)).id();
    let b = ws.add_component("b", Accumulator::new(2.0)).id();
    ws.couple(&scalar(a, "value"), &scalar(b, "value")).unwrap();
    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));

    e.step().unwrap();
    e.flush_events();
    let events = listener.events();
    assert_eq!(events.len(), 6);

    let coupling_at = events
        .iter()
        .position(|ev| matches!(ev, RecordedEvent::CouplingsUpdated(..)))
        .unwrap();
    assert_eq!(coupling_at, 4);
    for ev in &events[..4] {
        match ev {
            RecordedEvent::ComponentStarted(c) | RecordedEvent::ComponentFinished(c, _) => {
                assert_eq!(c.tick, TickId(1));
                assert_ne!(c.worker, WorkerId::DRIVER);
            }
            other => panic!("unexpected event before couplings: {other:?}"),
        }
    }
    for name in ["a", "b"] {
        let started = events.iter().position(|ev| match ev {
            RecordedEvent::ComponentStarted(c) => c.name == name,
            _ => false,
        });
        let finished = events.iter().position(|ev| match ev {
            RecordedEvent::ComponentFinished(c, Ok(())) => c.name == name,
            _ => false,
        });
        assert!(started.unwrap() < finished.unwrap());
    }
    match &events[4] {
        RecordedEvent::CouplingsUpdated(tick, report) => {
            assert_eq!(*tick, TickId(1));
            assert_eq!(report.committed, 1);
        }
        other => panic!("expected couplings, got {other:?}"),
    }
    match &events[5] {
        RecordedEvent::TickCompleted(m) => {
            assert_eq!(m.tick, TickId(1));
            assert_eq!(m.components_updated, 2);
            assert_eq!(m.couplings_committed, 1);
            assert_eq!(Some(m.clone()), e.last_metrics());
        }
        other => panic!("expected tick completion, got {other:?}"),
    }
}

#[test]
fn strict_ordering_delivers_before_step_returns() {
    let e = engine_with(EngineConfig {
        worker_count: Some(2),
        strict_event_ordering: true,
        ..EngineConfig::default()
    });
    e.workspace().add_component("a", Accumulator::new(0.0));
    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));

    for expected in 1..=3 {
        e.step().unwrap();
        assert_eq!(listener.completed_ticks(), ticks(1..=expected));
    }
}

#[test]
fn removed_listener_hears_nothing_more() {
    let e = engine(1);
    e.workspace().add_component("a", Accumulator::new(0.0));
    let (kept, removed) = (CollectingListener::new(), CollectingListener::new());
    e.add_listener(Box::new(kept.clone()));
    let id = e.add_listener(Box::new(removed.clone()));

    e.step_n(2);
    e.remove_listener(id);
    e.remove_listener(id);
    e.step_n(2);
    e.flush_events();
    assert_eq!(kept.completed_ticks(), ticks(1..=4));
    assert_eq!(removed.completed_ticks(), ticks(1..=2));
}

#[test]
fn configuration_changes_are_reported() {
    let e = engine(2);
    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));

    e.set_controller(Box::new(SerialUpdate));
    e.set_worker_count(3).unwrap();
    // Same size: nothing rebuilt, nothing reported.
    e.set_worker_count(3).unwrap();
    e.flush_events();
    assert_eq!(
        listener.events(),
        vec![
            RecordedEvent::ControllerChanged("serial".into()),
            RecordedEvent::WorkerCountChanged(3),
        ]
    );
}

/// Calls back into the engine from every `tick_completed`.
struct Reentrant {
    engine: Weak<UpdateEngine>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl UpdateListener for Reentrant {
    fn tick_completed(&mut self, _: &TickMetrics) {
        if let Some(engine) = self.engine.upgrade() {
            engine.set_controller(Box::new(SerialUpdate));
            engine.flush_events();
            self.seen.lock().unwrap().push(engine.controller_name());
        }
    }
}

#[test]
fn strict_listener_may_call_back_into_engine() {
    let e = Arc::new(engine_with(EngineConfig {
        worker_count: Some(2),
        strict_event_ordering: true,
        ..EngineConfig::default()
    }));
    e.workspace().add_component("a", Accumulator::new(0.0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    e.add_listener(Box::new(Reentrant {
        engine: Arc::downgrade(&e),
        seen: Arc::clone(&seen),
    }));

    for expected in 1..=3 {
        e.step().unwrap();
        assert_eq!(seen.lock().unwrap().len(), expected);
    }

    e.start().unwrap();
    assert!(wait_until(|| e.current_tick().0 >= 6));
    e.shutdown();
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len() as u64, e.current_tick().0);
    assert!(seen.iter().all(|name| name == "serial"));
}

// ── Worker pool ──────────────────────────────────────────────────

#[test]
fn resized_pool_runs_the_next_tick() {
    let e = engine(1);
    let ws = e.workspace();
    let handles: Vec<_> = (0..6)
        .map(|i| ws.add_component(format!("a{i}"), Accumulator::new(0.0)))
        .collect();
    e.step().unwrap();
    assert_eq!(e.set_worker_count(3), Ok(()));
    assert_eq!(e.worker_count(), 3);

    let listener = CollectingListener::new();
    e.add_listener(Box::new(listener.clone()));
    let report = e.step().unwrap();
    assert_eq!(report.metrics.components_updated, 6);
    e.flush_events();
    let finished = listener.finished_in(TickId(2));
    assert_eq!(finished.len(), 6);
    let pooled = |worker: WorkerId| (1..=3).contains(&worker.0);
    assert!(finished.iter().all(|(ev, _)| pooled(ev.worker)));
    for h in &handles {
        assert_eq!(h.downcast::<Accumulator, _>(|a| a.updates), Some(2));
    }

    e.start().unwrap();
    assert_eq!(e.set_worker_count(1), Err(ConfigError::EngineRunning));
    e.shutdown();
    assert_eq!(e.worker_count(), 3);
}

// ── Parallelism ──────────────────────────────────────────────────

#[test]
fn slow_components_overlap_on_workers() {
    let e = engine(4);
    let delay = Duration::from_millis(40);
    let ws = e.workspace();
    let handles: Vec<_> = (0..4)
        .map(|i| ws.add_component(format!("slow-{i}"), Slow::new(delay)))
        .collect();

    let begun = Instant::now();
    e.step().unwrap();
    assert!(begun.elapsed() < delay * 4);
    for h in &handles {
        assert_eq!(h.downcast::<Slow, _>(|s| s.updates), Some(1));
    }
}
