//! The simulation model.
//!
//! A [`Model`] is the single owner of every value, node and listener of one
//! circuit instance. It is built once, initialized with [`Model::init`] and
//! then driven by writing inputs and calling [`Model::do_step`] until the
//! circuit is discarded.
//!
//! # Lifecycle
//!
//! ```text
//! Building ── init() ──> Initializing ──> Running ── close() ──> Closed
//! ```
//!
//! Nodes can only be added while building. A failing step leaves the model
//! in its current state; the caller decides whether to go on or to close it.
//!
//! # Threading
//!
//! The model has no internal locking. It is `Send`, so a host may move it to
//! a simulation thread and share it behind a mutex, but every call has to be
//! serialized by the caller.

mod propagate;
mod step;


use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::node::{Node, Outputs};
use crate::storage::{ObservableValue, ValueStore};
use crate::types::{
    ListenerId, ModelConfig, ModelEvent, ModelState, NodeId, Observer, Signal, ValueId,
};
use crate::value::Value;

/// Callback invoked with the value that changed and its new state.
pub type ListenerFn = Box<dyn FnMut(ValueId, Value) + Send>;

/// Callback invoked on model events.
pub type EventFn = Box<dyn FnMut(ModelEvent) + Send>;

struct NodeSlot {
    node: Box<dyn Node>,
    /// Model version at the time the node was last scheduled, `u64::MAX`
    /// if it never was.
    version: u64,
}

struct EventObserver {
    events: Vec<ModelEvent>,
    callback: EventFn,
}

/// Owner of the circuit graph and the microstep scheduler.
pub struct Model {
    config: ModelConfig,
    state: ModelState,
    values: ValueStore,
    nodes: Vec<NodeSlot>,
    listeners: Vec<Option<ListenerFn>>,
    event_observers: Vec<EventObserver>,
    input_signals: Vec<Signal>,
    output_signals: Vec<Signal>,
    /// Nodes evaluated in the running microstep.
    active: Vec<NodeId>,
    /// Nodes scheduled for the next microstep.
    next: Vec<NodeId>,
    /// Incremented once per microstep.
    version: u64,
    /// Microsteps taken by the running `do_step`.
    counter: usize,
    rng: ChaCha8Rng,
    // scratch buffers reused across evaluations
    outputs: Outputs,
    immediate: Outputs,
    fan_out_stack: Vec<(ValueId, usize)>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create an empty model with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.noise_seed);
        Self {
            config,
            state: ModelState::Building,
            values: ValueStore::new(),
            nodes: Vec::new(),
            listeners: Vec::new(),
            event_observers: Vec::new(),
            input_signals: Vec::new(),
            output_signals: Vec::new(),
            active: Vec::new(),
            next: Vec::new(),
            version: 0,
            counter: 0,
            rng,
            outputs: Outputs::new(),
            immediate: Outputs::new(),
            fan_out_stack: Vec::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// True until the model is closed.
    pub fn is_running(&self) -> bool {
        self.state != ModelState::Closed
    }

    /// Set the number of microsteps after which a step counts as oscillating.
    pub fn set_oscillation_detection_counter(&mut self, max_microsteps: usize) {
        self.config.max_microsteps = max_microsteps;
    }

    /// Let an oscillating step retry in noise mode before it fails.
    pub fn set_recover_from_oscillation(&mut self, recover: bool) {
        self.config.recover_from_oscillation = recover;
    }

    // --- values ---

    /// Create a new signal cell, initially zero.
    pub fn create_value(&mut self, name: impl Into<String>, bits: u8) -> Result<ValueId> {
        self.values.create(name, bits)
    }

    /// Create a cell holding `value` that cannot be written.
    pub fn create_constant(&mut self, name: impl Into<String>, bits: u8, value: u64) -> Result<ValueId> {
        self.values.create_constant(name, bits, value)
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn cell(&self, id: ValueId) -> Result<&ObservableValue> {
        self.values.cell(id)
    }

    /// Mutable access to a cell's metadata. State changes go through the
    /// `set*` methods so observers are notified.
    pub fn cell_mut(&mut self, id: ValueId) -> Result<&mut ObservableValue> {
        self.values.cell_mut(id)
    }

    /// Numeric state of `id`. Fails if any bit floats.
    pub fn get(&self, id: ValueId) -> Result<Value> {
        self.values.get(id)
    }

    /// State of `id` including floating bits.
    pub fn snapshot(&self, id: ValueId) -> Result<Value> {
        self.values.snapshot(id)
    }

    /// Write `raw` and the floating mask `high_z` to `id`.
    ///
    /// If the masked state differs from the stored one, every observer is
    /// notified in registration order before this returns. Writing the
    /// stored state again does nothing.
    pub fn set(&mut self, id: ValueId, raw: u64, high_z: u64) -> Result<()> {
        if self.state == ModelState::Closed {
            return Err(Error::Closed);
        }
        if self.values.store(id, raw, high_z)? {
            self.fan_out(id)?;
        }
        Ok(())
    }

    /// Drive every bit of `id`.
    pub fn set_value(&mut self, id: ValueId, raw: u64) -> Result<()> {
        self.set(id, raw, 0)
    }

    pub fn set_bool(&mut self, id: ValueId, b: bool) -> Result<()> {
        self.set(id, u64::from(b), 0)
    }

    /// Let every bit of `id` float, or drive them all again. Floating bits
    /// are stored as zero, so bits that floated come back driven low.
    pub fn set_high_z(&mut self, id: ValueId, high_z: bool) -> Result<()> {
        let raw = self.values.cell(id)?.value_high_z_is_zero();
        self.set(id, raw, if high_z { u64::MAX } else { 0 })
    }

    // --- nodes ---

    /// Register a node. Its observed values get the node as observer.
    pub fn add<N: Node + 'static>(&mut self, node: N) -> Result<NodeId> {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn Node>) -> Result<NodeId> {
        match self.state {
            ModelState::Building => {}
            ModelState::Closed => return Err(Error::Closed),
            _ => return Err(Error::AlreadyInitialized),
        }
        for &value in node.observed().iter().chain(node.outputs()) {
            self.values.cell(value)?;
        }

        let id = NodeId(self.nodes.len() as u32);
        for &value in node.observed() {
            self.values.cell_mut(value)?.add_observer(Observer::Node(id));
        }
        debug!(node = %id, kind = node.description(), "node added");
        self.nodes.push(NodeSlot {
            node,
            version: u64::MAX,
        });
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&dyn Node> {
        self.nodes
            .get(id.index())
            .map(|slot| slot.node.as_ref())
            .ok_or(Error::UnknownNode(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Nodes holding state, such as flip-flops.
    pub fn stateful_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|id| self.nodes[id.index()].node.has_state())
            .collect()
    }

    // --- observers ---

    /// Register `observer` on `value`. Registering twice has no effect.
    pub fn add_observer(&mut self, value: ValueId, observer: Observer) -> Result<()> {
        self.check_observer(observer)?;
        self.values.cell_mut(value)?.add_observer(observer);
        Ok(())
    }

    /// Returns false if `observer` was not registered on `value`.
    pub fn remove_observer(&mut self, value: ValueId, observer: Observer) -> Result<bool> {
        Ok(self.values.cell_mut(value)?.remove_observer(observer))
    }

    /// Register a callback on `value`.
    ///
    /// Listeners are opaque to the graph analyses: a walk that reaches one
    /// fails with [`Error::Backtrack`].
    pub fn add_listener<F>(&mut self, value: ValueId, callback: F) -> Result<ListenerId>
    where
        F: FnMut(ValueId, Value) + Send + 'static,
    {
        self.values.cell(value)?;
        let id = ListenerId(self.listeners.len() as u32);
        self.listeners.push(Some(Box::new(callback)));
        self.values
            .cell_mut(value)?
            .add_observer(Observer::Listener(id));
        Ok(id)
    }

    /// Drop a listener and unregister it from every value.
    pub fn remove_listener(&mut self, id: ListenerId) -> Result<()> {
        let slot = self
            .listeners
            .get_mut(id.0 as usize)
            .ok_or(Error::UnknownListener(id))?;
        if slot.take().is_none() {
            return Err(Error::UnknownListener(id));
        }
        for index in 0..self.values.len() {
            self.values
                .cell_mut(ValueId(index as u32))?
                .remove_observer(Observer::Listener(id));
        }
        Ok(())
    }

    fn check_observer(&self, observer: Observer) -> Result<()> {
        match observer {
            Observer::Node(id) if id.index() >= self.nodes.len() => Err(Error::UnknownNode(id)),
            Observer::Listener(id) if !matches!(self.listeners.get(id.0 as usize), Some(Some(_))) => {
                Err(Error::UnknownListener(id))
            }
            _ => Ok(()),
        }
    }

    // --- events ---

    /// Call `callback` whenever one of `events` fires.
    pub fn add_event_observer<F>(&mut self, events: &[ModelEvent], callback: F)
    where
        F: FnMut(ModelEvent) + Send + 'static,
    {
        self.event_observers.push(EventObserver {
            events: events.to_vec(),
            callback: Box::new(callback),
        });
    }

    fn fire_event(&mut self, event: ModelEvent) {
        for observer in &mut self.event_observers {
            if observer.events.contains(&event) {
                (observer.callback)(event);
            }
        }
    }

    /// Close the model. Later writes and steps fail with [`Error::Closed`].
    pub fn close(&mut self) {
        if self.state != ModelState::Closed {
            self.state = ModelState::Closed;
            info!(microsteps = self.version, "model closed");
            self.fire_event(ModelEvent::Closed);
        }
    }

    // --- signals ---

    /// Register a circuit input. Names must be non-empty and unique.
    pub fn add_input(&mut self, signal: Signal) -> Result<()> {
        self.check_signal(&signal)?;
        self.input_signals.push(signal);
        Ok(())
    }

    /// Register a circuit output. Names must be non-empty and unique.
    pub fn add_output(&mut self, signal: Signal) -> Result<()> {
        self.check_signal(&signal)?;
        self.output_signals.push(signal);
        Ok(())
    }

    pub fn inputs(&self) -> &[Signal] {
        &self.input_signals
    }

    pub fn outputs(&self) -> &[Signal] {
        &self.output_signals
    }

    /// Look up an input or output by name.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.input_signals
            .iter()
            .chain(&self.output_signals)
            .find(|s| s.name() == name)
    }

    fn check_signal(&self, signal: &Signal) -> Result<()> {
        self.values.cell(signal.value())?;
        if signal.name().is_empty() || self.signal(signal.name()).is_some() {
            return Err(Error::InvalidSignal {
                name: signal.name().to_string(),
            });
        }
        Ok(())
    }

    // --- diagnostics ---

    /// Render `err` with the circuit elements it refers to, e.g.
    /// `circuit seems to oscillate ...; affected components are: signal Q, 2*NOT`.
    pub fn describe_error(&self, err: &Error) -> String {
        let mut items: Vec<String> = err
            .values()
            .into_iter()
            .filter_map(|id| self.values.cell(id).ok())
            .map(|cell| format!("signal {}", cell.name()))
            .collect();

        let mut kinds: IndexMap<&str, usize> = IndexMap::new();
        for id in err.nodes() {
            if let Some(slot) = self.nodes.get(id.index()) {
                *kinds.entry(slot.node.description()).or_default() += 1;
            }
        }
        items.extend(kinds.into_iter().map(|(kind, count)| {
            if count > 1 {
                format!("{count}*{kind}")
            } else {
                kind.to_string()
            }
        }));

        if items.is_empty() {
            err.to_string()
        } else {
            format!("{err}; affected components are: {}", items.join(", "))
        }
    }
}
