//! Integration test harness for the digital kernel.
//!
//! This crate provides a small circuit builder for end-to-end testing of the
//! full pipeline: Build → Analyse → Initialize → Drive inputs → Verify.
//! Values are addressed by name and every helper panics on failure, so
//! tests read like a description of the circuit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use digital_kernel::gates::{DFlipFlop, Driver, Gate, LogicOp, Not, Splitter};
use digital_kernel::{Model, ModelConfig, Node, Signal, Value, ValueId};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING: Once = Once::new();

/// Install a tracing subscriber for tests.
///
/// The filter is taken from `RUST_LOG` and defaults to `digital_kernel=warn`.
/// Safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "digital_kernel=warn".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

/// Shared log of the states a value went through.
pub type Recording = Arc<Mutex<Vec<Value>>>;

/// Test harness building and driving a circuit by value names.
pub struct TestHarness {
    model: Model,
    names: HashMap<String, ValueId>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        init_tracing();
        Self {
            model: Model::with_config(config),
            names: HashMap::new(),
        }
    }

    /// Create a named value.
    ///
    /// # Panics
    ///
    /// Panics if the name is taken or the width is invalid.
    pub fn wire(&mut self, name: &str, bits: u8) -> ValueId {
        assert!(!self.names.contains_key(name), "duplicate value name {name}");
        let id = self
            .model
            .create_value(name, bits)
            .unwrap_or_else(|e| panic!("cannot create {name}: {e}"));
        self.names.insert(name.to_string(), id);
        id
    }

    /// Create a value and register it as a circuit input.
    pub fn input(&mut self, name: &str, bits: u8) -> ValueId {
        let id = self.wire(name, bits);
        self.model
            .add_input(Signal::new(name, id))
            .unwrap_or_else(|e| panic!("cannot register input {name}: {e}"));
        id
    }

    /// Register an existing value as a circuit output.
    pub fn output(&mut self, name: &str) -> ValueId {
        let id = self.id(name);
        self.model
            .add_output(Signal::new(name, id))
            .unwrap_or_else(|e| panic!("cannot register output {name}: {e}"));
        id
    }

    /// Add a gate driving a new value `out` as wide as its first input.
    pub fn gate(&mut self, op: LogicOp, inputs: &[&str], out: &str) -> ValueId {
        let ids: Vec<ValueId> = inputs.iter().map(|n| self.id(n)).collect();
        let bits = self.bits(inputs[0]);
        let y = self.wire(out, bits);
        let gate = Gate::new(&self.model, op, &ids, y).expect("gate wiring");
        self.add(gate);
        y
    }

    pub fn not(&mut self, input: &str, out: &str) -> ValueId {
        let a = self.id(input);
        let y = self.wire(out, self.bits(input));
        let not = Not::new(&self.model, a, y).expect("inverter wiring");
        self.add(not);
        y
    }

    /// Add a D flip-flop with outputs `q` and `q_n`.
    pub fn flip_flop(&mut self, d: &str, clock: &str, q: &str, q_n: &str) -> ValueId {
        let bits = self.bits(d);
        let (d, clock) = (self.id(d), self.id(clock));
        let q = self.existing_or_new(q, bits);
        let q_n = self.existing_or_new(q_n, bits);
        let ff = DFlipFlop::new(&self.model, d, clock, q, q_n).expect("flip-flop wiring");
        self.add(ff);
        q
    }

    /// Add a tri-state driver onto the existing value `out`.
    pub fn driver(&mut self, input: &str, enable: &str, out: &str) {
        let (input, enable, out) = (self.id(input), self.id(enable), self.id(out));
        let driver = Driver::new(&self.model, input, enable, out).expect("driver wiring");
        self.add(driver);
    }

    /// Add a zero-delay slice of `bits` bits at `offset`.
    pub fn splitter(&mut self, input: &str, offset: u8, bits: u8, out: &str) -> ValueId {
        let a = self.id(input);
        let y = self.wire(out, bits);
        let splitter = Splitter::new(&self.model, a, offset, y).expect("splitter wiring");
        self.add(splitter);
        y
    }

    /// Add any node.
    pub fn add<N: Node + 'static>(&mut self, node: N) {
        let kind = node.description().to_string();
        let id = self
            .model
            .add(node)
            .unwrap_or_else(|e| panic!("cannot add {kind}: {e}"));
        debug!(node = %id, kind, "harness node added");
    }

    /// Initialize the model. Returns the microsteps needed to stabilize.
    pub fn init(&mut self) -> usize {
        self.model.init(false).expect("init failed")
    }

    pub fn init_with_noise(&mut self) -> usize {
        self.model.init(true).expect("init with noise failed")
    }

    /// Write a value without stepping.
    pub fn set(&mut self, name: &str, value: u64) {
        let id = self.id(name);
        self.model
            .set_value(id, value)
            .unwrap_or_else(|e| panic!("cannot set {name}: {e}"));
    }

    pub fn set_high_z(&mut self, name: &str) {
        let id = self.id(name);
        self.model.set_high_z(id, true).expect("set high z");
    }

    /// Run one step. Returns the microsteps taken.
    pub fn step(&mut self) -> usize {
        self.model.do_step(false).expect("step failed")
    }

    /// Write a value and step.
    pub fn apply(&mut self, name: &str, value: u64) -> usize {
        self.set(name, value);
        self.step()
    }

    /// One full clock cycle: rising edge, settle, falling edge, settle.
    pub fn clock(&mut self, name: &str) {
        self.apply(name, 1);
        self.apply(name, 0);
    }

    /// Numeric value of `name`.
    ///
    /// # Panics
    ///
    /// Panics if the value floats.
    pub fn get(&self, name: &str) -> u64 {
        self.model
            .get(self.id(name))
            .unwrap_or_else(|e| panic!("cannot read {name}: {e}"))
            .value()
    }

    /// State of `name` including floating bits.
    pub fn snapshot(&self, name: &str) -> Value {
        self.model.snapshot(self.id(name)).expect("snapshot")
    }

    /// Record every change of `name` from now on.
    pub fn record(&mut self, name: &str) -> Recording {
        let log: Recording = Arc::default();
        let sink = Arc::clone(&log);
        self.model
            .add_listener(self.id(name), move |_, v| {
                if let Ok(mut log) = sink.lock() {
                    log.push(v);
                }
            })
            .expect("listener");
        log
    }

    pub fn id(&self, name: &str) -> ValueId {
        *self
            .names
            .get(name)
            .unwrap_or_else(|| panic!("unknown value {name}"))
    }

    pub fn signal(&self, name: &str) -> Signal {
        Signal::new(name, self.id(name))
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn bits(&self, name: &str) -> u8 {
        self.model.cell(self.id(name)).expect("cell").bits()
    }

    fn existing_or_new(&mut self, name: &str, bits: u8) -> ValueId {
        match self.names.get(name) {
            Some(&id) => id,
            None => self.wire(name, bits),
        }
    }
}
