//! Braid Quickstart: two coupled oscillators driven by the update engine.
//!
//! Demonstrates:
//!   1. Implementing a component with a method table
//!   2. Coupling a getter on one component to a setter on another
//!   3. Listening for tick events
//!   4. Stepping synchronously, then running on the driver thread
//!   5. Injecting a change between ticks with `submit_task`
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example quickstart

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use braid_core::{
    scalar_arg, AccessError, Component, ComponentError, MethodTable, ObjectRef, TickId, Value,
    ValueType,
};
use braid_coupling::{Attribute, Workspace};
use braid_engine::{EngineConfig, TickMetrics, UpdateEngine, UpdateListener};

// ─── Oscillator ─────────────────────────────────────────────────
//
// A damped harmonic oscillator stepped with semi-implicit Euler. The
// `drive` setter takes the force and a gain as an auxiliary argument;
// forces accumulate until the next update.

const DT: f64 = 0.05;

struct Oscillator {
    position: f64,
    velocity: f64,
    stiffness: f64,
    damping: f64,
    force: f64,
}

impl Oscillator {
    fn new(position: f64, stiffness: f64) -> Self {
        Self {
            position,
            velocity: 0.0,
            stiffness,
            damping: 0.1,
            force: 0.0,
        }
    }

    fn table() -> MethodTable {
        MethodTable::builder::<Oscillator>()
            .scalar_getter("position", |o| o.position)
            .scalar_setter("position", |o, v| o.position = v)
            .setter(
                ObjectRef::ROOT_KIND,
                "drive",
                ValueType::Scalar,
                &[ValueType::Scalar],
                |o, _, args| {
                    let force = scalar_arg(args, 0)?;
                    let gain = scalar_arg(args, 1)?;
                    if !gain.is_finite() {
                        return Err(AccessError::InvalidArgument {
                            index: 1,
                            reason: "gain must be finite".into(),
                        });
                    }
                    o.force += force * gain;
                    Ok(())
                },
            )
            .build()
    }
}

impl Component for Oscillator {
    fn update(&mut self) -> Result<(), ComponentError> {
        let accel = -self.stiffness * self.position - self.damping * self.velocity + self.force;
        self.velocity += accel * DT;
        self.position += self.velocity * DT;
        self.force = 0.0;
        if !self.position.is_finite() {
            return Err(ComponentError::failed("oscillator diverged"));
        }
        Ok(())
    }

    fn method_table(&self) -> Arc<MethodTable> {
        static TABLE: OnceLock<Arc<MethodTable>> = OnceLock::new();
        Arc::clone(TABLE.get_or_init(|| Arc::new(Self::table())))
    }
}

// ─── Listener ───────────────────────────────────────────────────

struct Progress;

impl UpdateListener for Progress {
    fn tick_completed(&mut self, metrics: &TickMetrics) {
        if metrics.tick.0 % 20 == 0 {
            println!(
                "  tick {:>4}: {} updated, {} couplings, {}us",
                metrics.tick,
                metrics.components_updated,
                metrics.couplings_committed,
                metrics.total_us
            );
        }
    }

    fn engine_stopped(&mut self, tick: TickId) {
        println!("  driver stopped at tick {tick}");
    }
}

fn positions(engine: &UpdateEngine) -> Vec<f64> {
    engine.with_all_locks(|locked| {
        let ids: Vec<_> = locked.ids().collect();
        ids.into_iter()
            .filter_map(|id| locked.downcast_ref::<Oscillator>(id).map(|o| o.position))
            .collect()
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // ─── 1. Build the workspace ─────────────────────────────────
    let workspace = Arc::new(Workspace::new());
    let left = workspace
        .add_component("left", Oscillator::new(1.0, 4.0))
        .id();
    let right = workspace
        .add_component("right", Oscillator::new(0.0, 4.0))
        .id();

    // ─── 2. Couple them both ways, each with a gain ─────────────
    let pos = |id| Attribute::new(id, "position", ValueType::Scalar);
    let drive = |id| {
        Attribute::new(id, "drive", ValueType::Scalar).with_aux_args([Value::Scalar(0.8)])
    };
    workspace.couple(&pos(left), &drive(right))?;
    workspace.couple(&pos(right), &drive(left))?;

    println!("producers on left:");
    for p in workspace.potential_producers(left) {
        println!("  {}", p.description());
    }

    // ─── 3. Engine and listener ─────────────────────────────────
    let engine = UpdateEngine::new(
        Arc::clone(&workspace),
        EngineConfig {
            worker_count: Some(2),
            tick_delay: Duration::from_millis(2),
            ..EngineConfig::default()
        },
    )?;
    engine.add_listener(Box::new(Progress));

    // ─── 4. Step synchronously ──────────────────────────────────
    for report in engine.step_n(40) {
        if !report.is_clean() {
            println!("tick {} had failures", report.tick);
        }
    }
    engine.flush_events();
    println!("after 40 steps: {:?}", positions(&engine));

    // ─── 5. Run on the driver thread, then kick the left one ────
    engine.start()?;
    thread::sleep(Duration::from_millis(100));
    engine.submit_task(move |ws: &Workspace| {
        if let Some(h) = ws.component(left) {
            h.downcast_mut::<Oscillator, _>(|o| o.velocity += 2.0);
        }
    });
    thread::sleep(Duration::from_millis(100));
    engine.shutdown();

    println!(
        "after {} ticks: {:?}",
        engine.current_tick(),
        positions(&engine)
    );
    Ok(())
}
