//! Integration test: the built-in update controllers.
//!
//! Uses [`Recorder`] components sharing a [`CallLog`] to observe the
//! order each policy updates components and runs couplings in.

use std::time::{Duration, Instant};

use braid_core::ComponentId;
use braid_coupling::Workspace;
use braid_engine::{ActionSequence, PriorityUpdate, SerialUpdate, UpdateAction};
use braid_test_utils::{engine, scalar, Accumulator, Call, CallLog, Recorder};
use proptest::prelude::*;

fn recorders(ws: &Workspace, log: &CallLog, names: &[&str]) -> Vec<ComponentId> {
    names
        .iter()
        .map(|n| ws.add_component(*n, Recorder::new(*n, 0.0, log)).id())
        .collect()
}

fn updates(log: &CallLog) -> Vec<String> {
    log.calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Update(n) => Some(n),
            _ => None,
        })
        .collect()
}

// ── BufferedUpdate ───────────────────────────────────────────────

#[test]
fn buffered_updates_before_couplings() {
    let e = engine(3);
    let log = CallLog::new();
    let ids = recorders(e.workspace(), &log, &["a", "b", "c"]);
    e.workspace()
        .couple(&scalar(ids[0], "out"), &scalar(ids[2], "in"))
        .unwrap();
    assert_eq!(e.controller_name(), "buffered");

    e.step().unwrap();
    let calls = log.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls[..3].iter().all(|c| matches!(c, Call::Update(_))));
    assert_eq!(
        calls[3..],
        [Call::Read("a".into()), Call::Write("c".into())]
    );
}

// ── SerialUpdate ─────────────────────────────────────────────────

#[test]
fn serial_follows_workspace_order() {
    let e = engine(4);
    let log = CallLog::new();
    recorders(e.workspace(), &log, &["first", "second", "third"]);
    e.set_controller(Box::new(SerialUpdate));
    assert_eq!(e.controller_name(), "serial");

    e.step_n(2);
    assert_eq!(
        updates(&log),
        ["first", "second", "third", "first", "second", "third"]
    );
}

// ── PriorityUpdate ───────────────────────────────────────────────

#[test]
fn priority_runs_lowest_first() {
    let e = engine(4);
    let log = CallLog::new();
    let ids = recorders(e.workspace(), &log, &["late", "early", "middle", "default"]);
    e.set_controller(Box::new(
        PriorityUpdate::new()
            .with_priority(ids[0], 10)
            .with_priority(ids[1], -5)
            .with_priority(ids[2], 3),
    ));

    e.step().unwrap();
    assert_eq!(updates(&log), ["early", "default", "middle", "late"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whatever the priorities, no component updates before one with a
    /// lower priority.
    #[test]
    fn priority_order_is_non_decreasing(priorities in proptest::collection::vec(-3i32..3, 1..6)) {
        let e = engine(3);
        let log = CallLog::new();
        let names: Vec<String> = (0..priorities.len()).map(|i| format!("c{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let ids = recorders(e.workspace(), &log, &name_refs);
        let mut policy = PriorityUpdate::new();
        for (id, p) in ids.iter().zip(&priorities) {
            policy.set_priority(*id, *p);
        }
        e.set_controller(Box::new(policy));

        e.step().unwrap();
        let seen: Vec<i32> = updates(&log)
            .iter()
            .map(|n| priorities[n[1..].parse::<usize>().unwrap()])
            .collect();
        prop_assert_eq!(seen.len(), priorities.len());
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }
}

// ── ActionSequence ───────────────────────────────────────────────

#[test]
fn action_sequence_runs_in_script_order() {
    let e = engine(2);
    let ws = e.workspace();
    let a = ws.add_component("a", Accumulator::new(0.0).with_increment(1.0));
    let b = ws.add_component("b", Accumulator::new(0.0).with_increment(10.0));
    ws.couple(&scalar(a.id(), "value"), &scalar(b.id(), "value"))
        .unwrap();
    ws.couple(&scalar(b.id(), "value"), &scalar(a.id(), "value"))
        .unwrap();

    let mut sequence = ActionSequence::new(vec![
        UpdateAction::UpdateComponent(a.id()),
        UpdateAction::UpdateCouplingsBetween(a.id(), b.id()),
        UpdateAction::UpdateComponent(b.id()),
        UpdateAction::UpdateComponent(ComponentId(999)),
    ]);
    assert_eq!(
        sequence.remove(3),
        Some(UpdateAction::UpdateComponent(ComponentId(999)))
    );
    e.set_controller(Box::new(sequence.clone()));

    let report = e.step().unwrap();
    // a: 0 + 1; a -> b; b: 1 + 10. The b -> a coupling never runs.
    assert_eq!(a.downcast::<Accumulator, _>(|x| x.value), Some(1.0));
    assert_eq!(b.downcast::<Accumulator, _>(|x| x.value), Some(11.0));
    assert_eq!(report.couplings.committed, 1);

    // Same script, couplings between first.
    sequence.reorder(1, 0);
    assert_eq!(
        sequence.actions()[0],
        UpdateAction::UpdateCouplingsBetween(a.id(), b.id())
    );
    e.set_controller(Box::new(sequence));
    e.step().unwrap();
    assert_eq!(a.downcast::<Accumulator, _>(|x| x.value), Some(2.0));
    assert_eq!(b.downcast::<Accumulator, _>(|x| x.value), Some(11.0));
}

#[test]
fn action_sequence_directional_couplings() {
    let e = engine(2);
    let ws = e.workspace();
    let a = ws.add_component("a", Accumulator::new(1.0));
    let b = ws.add_component("b", Accumulator::new(2.0));
    let c = ws.add_component("c", Accumulator::new(0.0));
    ws.couple(&scalar(a.id(), "value"), &scalar(c.id(), "increment"))
        .unwrap();
    ws.couple(&scalar(b.id(), "value"), &scalar(c.id(), "value"))
        .unwrap();
    ws.couple(&scalar(a.id(), "value"), &scalar(b.id(), "increment"))
        .unwrap();

    e.set_controller(Box::new(ActionSequence::new(vec![
        UpdateAction::UpdateOutgoingCouplings(a.id()),
        UpdateAction::UpdateAllComponents,
        UpdateAction::UpdateIncomingCouplings(c.id()),
    ])));
    let report = e.step().unwrap();

    // Outgoing from a set both increments before the updates; only the
    // couplings into c ran afterwards.
    assert_eq!(report.couplings.committed, 4);
    assert_eq!(b.downcast::<Accumulator, _>(|x| x.value), Some(3.0));
    assert_eq!(c.downcast::<Accumulator, _>(|x| x.increment), Some(1.0));
    assert_eq!(c.downcast::<Accumulator, _>(|x| x.value), Some(3.0));
}

// ── Swapping while running ───────────────────────────────────────

#[test]
fn controller_can_change_while_running() {
    let e = engine(2);
    let log = CallLog::new();
    recorders(e.workspace(), &log, &["x", "y"]);

    e.start().unwrap();
    e.set_controller(Box::new(SerialUpdate));
    let from = e.current_tick().0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while e.current_tick().0 < from + 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    e.shutdown();

    assert_eq!(e.controller_name(), "serial");
    assert!(e.current_tick().0 >= from + 3);
}
