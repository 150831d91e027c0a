//! Mock components.

use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use braid_core::{
    scalar_arg, AccessError, Component, ComponentError, MethodTable, ObjectKey, ObjectRef, Value,
    ValueType,
};

fn cached(
    cell: &'static OnceLock<Arc<MethodTable>>,
    build: fn() -> MethodTable,
) -> Arc<MethodTable> {
    Arc::clone(cell.get_or_init(|| Arc::new(build())))
}

// ── Accumulator ───────────────────────────────────────────────────

/// Adds `increment` to `value` on every update.
///
/// Accessors: `value` (get/set), `increment` (set), `updates` (get).
#[derive(Clone, Debug, Default)]
pub struct Accumulator {
    pub value: f64,
    pub increment: f64,
    pub updates: u64,
}

impl Accumulator {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_increment(mut self, increment: f64) -> Self {
        self.increment = increment;
        self
    }

    fn table() -> MethodTable {
        MethodTable::builder::<Accumulator>()
            .scalar_getter("value", |a| a.value)
            .scalar_setter("value", |a, v| a.value = v)
            .scalar_setter("increment", |a, v| a.increment = v)
            .scalar_getter("updates", |a| a.updates as f64)
            .build()
    }
}

impl Component for Accumulator {
    fn update(&mut self) -> Result<(), ComponentError> {
        self.value += self.increment;
        self.updates += 1;
        Ok(())
    }

    fn method_table(&self) -> Arc<MethodTable> {
        static TABLE: OnceLock<Arc<MethodTable>> = OnceLock::new();
        cached(&TABLE, Self::table)
    }
}

// ── NeuronLayer ───────────────────────────────────────────────────

/// A row of neurons addressed as sub-objects `neuron-0`, `neuron-1`, ...
///
/// Each neuron (kind `neuron`) has an `activation` getter and an
/// `input` setter that accumulates until the next update, which moves
/// inputs into activations. The layer itself exposes `mean` and the
/// `activations` vector.
#[derive(Clone, Debug)]
pub struct NeuronLayer {
    pub activations: Vec<f64>,
    pub inputs: Vec<f64>,
}

impl NeuronLayer {
    pub const NEURON_KIND: &'static str = "neuron";

    pub fn new(size: usize) -> Self {
        Self {
            activations: vec![0.0; size],
            inputs: vec![0.0; size],
        }
    }

    pub fn neuron_key(index: usize) -> String {
        format!("neuron-{index}")
    }

    fn index(&self, object: &ObjectKey) -> Result<usize, AccessError> {
        object
            .as_str()
            .strip_prefix("neuron-")
            .and_then(|i| i.parse::<usize>().ok())
            .filter(|&i| i < self.activations.len())
            .ok_or_else(|| AccessError::MissingObject {
                object: object.clone(),
            })
    }

    fn table() -> MethodTable {
        MethodTable::builder::<NeuronLayer>()
            .getter(Self::NEURON_KIND, "activation", ValueType::Scalar, &[], |l, o, _| {
                Ok(Value::Scalar(l.activations[l.index(o)?]))
            })
            .setter(Self::NEURON_KIND, "input", ValueType::Scalar, &[], |l, o, args| {
                let i = l.index(o)?;
                l.inputs[i] += scalar_arg(args, 0)?;
                Ok(())
            })
            .scalar_getter("mean", |l| {
                if l.activations.is_empty() {
                    0.0
                } else {
                    l.activations.iter().sum::<f64>() / l.activations.len() as f64
                }
            })
            .getter(ObjectRef::ROOT_KIND, "activations", ValueType::Vector, &[], |l, _, _| {
                Ok(Value::Vector(l.activations.clone()))
            })
            .build()
    }
}

impl Component for NeuronLayer {
    fn update(&mut self) -> Result<(), ComponentError> {
        for (a, i) in self.activations.iter_mut().zip(self.inputs.iter_mut()) {
            *a = std::mem::take(i);
        }
        Ok(())
    }

    fn method_table(&self) -> Arc<MethodTable> {
        static TABLE: OnceLock<Arc<MethodTable>> = OnceLock::new();
        cached(&TABLE, Self::table)
    }

    fn objects(&self) -> Vec<ObjectRef> {
        let mut objects = vec![ObjectRef::root()];
        objects.extend(
            (0..self.activations.len())
                .map(|i| ObjectRef::new(Self::neuron_key(i), Self::NEURON_KIND)),
        );
        objects
    }
}

// ── Inspector ─────────────────────────────────────────────────────

/// Records the raw argument lists its setter receives.
///
/// - `record` setter: scalar value, aux `[Integer, Text]`.
/// - `scaled` getter: scalar, aux `[Integer]`, returns `level * aux_0`.
#[derive(Clone, Debug, Default)]
pub struct Inspector {
    pub level: f64,
    pub writes: Vec<Vec<Value>>,
}

impl Inspector {
    pub fn new(level: f64) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    fn table() -> MethodTable {
        MethodTable::builder::<Inspector>()
            .setter(
                ObjectRef::ROOT_KIND,
                "record",
                ValueType::Scalar,
                &[ValueType::Integer, ValueType::Text],
                |p, _, args| {
                    p.writes.push(args.to_vec());
                    Ok(())
                },
            )
            .getter(
                ObjectRef::ROOT_KIND,
                "scaled",
                ValueType::Scalar,
                &[ValueType::Integer],
                |p, _, args| {
                    let factor = args.first().and_then(Value::as_integer).unwrap_or(1);
                    Ok(Value::Scalar(p.level * factor as f64))
                },
            )
            .scalar_getter("level", |p| p.level)
            .build()
    }
}

impl Component for Inspector {
    fn update(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn method_table(&self) -> Arc<MethodTable> {
        static TABLE: OnceLock<Arc<MethodTable>> = OnceLock::new();
        cached(&TABLE, Self::table)
    }
}

// ── Faulty ────────────────────────────────────────────────────────

/// How a [`Faulty`] component misbehaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultMode {
    /// Updates succeed.
    Healthy,
    /// `update()` returns an error.
    Error,
    /// `update()` panics.
    Panic,
    /// The `value` getter returns an error.
    BrokenGetter,
}

/// A component whose update or getter fails on demand.
///
/// Accessors: `value` (get/set).
#[derive(Clone, Debug)]
pub struct Faulty {
    pub mode: FaultMode,
    pub value: f64,
    pub attempts: u64,
}

impl Faulty {
    pub fn new(mode: FaultMode) -> Self {
        Self {
            mode,
            value: 0.0,
            attempts: 0,
        }
    }

    fn table() -> MethodTable {
        MethodTable::builder::<Faulty>()
            .getter(ObjectRef::ROOT_KIND, "value", ValueType::Scalar, &[], |f, _, _| {
                if f.mode == FaultMode::BrokenGetter {
                    Err(AccessError::failed("getter is broken"))
                } else {
                    Ok(Value::Scalar(f.value))
                }
            })
            .scalar_setter("value", |f, v| f.value = v)
            .build()
    }
}

impl Component for Faulty {
    fn update(&mut self) -> Result<(), ComponentError> {
        self.attempts += 1;
        match self.mode {
            FaultMode::Error => Err(ComponentError::failed("faulty component refused")),
            FaultMode::Panic => panic!("faulty component panicked"),
            FaultMode::Healthy | FaultMode::BrokenGetter => Ok(()),
        }
    }

    fn method_table(&self) -> Arc<MethodTable> {
        static TABLE: OnceLock<Arc<MethodTable>> = OnceLock::new();
        cached(&TABLE, Self::table)
    }
}

// ── Slow ──────────────────────────────────────────────────────────

/// Sleeps for `delay` inside every update, then counts it.
///
/// Accessors: `updates` (get).
#[derive(Clone, Debug)]
pub struct Slow {
    pub delay: Duration,
    pub updates: u64,
}

impl Slow {
    pub fn new(delay: Duration) -> Self {
        Self { delay, updates: 0 }
    }

    fn table() -> MethodTable {
        MethodTable::builder::<Slow>()
            .scalar_getter("updates", |s| s.updates as f64)
            .build()
    }
}

impl Component for Slow {
    fn update(&mut self) -> Result<(), ComponentError> {
        thread::sleep(self.delay);
        self.updates += 1;
        Ok(())
    }

    fn method_table(&self) -> Arc<MethodTable> {
        static TABLE: OnceLock<Arc<MethodTable>> = OnceLock::new();
        cached(&TABLE, Self::table)
    }
}

// ── Recorder ──────────────────────────────────────────────────────

/// One entry in a [`CallLog`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Update(String),
    Read(String),
    Write(String),
}

/// Shared, ordered record of calls made on [`Recorder`] components.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Logs every update, `out` read, and `in` write to a shared [`CallLog`].
///
/// Accessors: `out` (get, returns `value`), `in` (set, stores into `value`).
#[derive(Clone, Debug)]
pub struct Recorder {
    pub name: String,
    pub value: f64,
    pub log: CallLog,
}

impl Recorder {
    pub fn new(name: impl Into<String>, value: f64, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            value,
            log: log.clone(),
        }
    }

    fn table() -> MethodTable {
        MethodTable::builder::<Recorder>()
            .scalar_getter("out", |r| {
                r.log.push(Call::Read(r.name.clone()));
                r.value
            })
            .scalar_setter("in", |r, v| {
                r.log.push(Call::Write(r.name.clone()));
                r.value = v;
            })
            .build()
    }
}

impl Component for Recorder {
    fn update(&mut self) -> Result<(), ComponentError> {
        self.log.push(Call::Update(self.name.clone()));
        Ok(())
    }

    fn method_table(&self) -> Arc<MethodTable> {
        static TABLE: OnceLock<Arc<MethodTable>> = OnceLock::new();
        cached(&TABLE, Self::table)
    }
}
