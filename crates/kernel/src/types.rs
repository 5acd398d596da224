//! Core kernel types
//!
//! Arena handles, the observer capability, signals and model configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle of an observable value inside a model's value arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl ValueId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value#{}", self.0)
    }
}

/// Handle of a node registered with a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Handle of an opaque change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Anything registered to receive change notifications from a value.
///
/// A `Node` observer can be traversed: graph walkers continue through its
/// outputs. A `Listener` is an opaque sink and ends any traversal with a
/// backtrack error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Observer {
    Node(NodeId),
    Listener(ListenerId),
}

impl fmt::Display for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observer::Node(id) => write!(f, "{id}"),
            Observer::Listener(id) => write!(f, "{id}"),
        }
    }
}

/// A named circuit terminal: a name paired with the value it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    name: String,
    value: ValueId,
}

impl Signal {
    /// Create a signal. The name is trimmed and inner spaces become `_`.
    pub fn new(name: impl AsRef<str>, value: ValueId) -> Self {
        Self {
            name: name.as_ref().trim().replace(' ', "_"),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> ValueId {
        self.value
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lifecycle of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    /// Nodes may still be added.
    Building,
    /// The initial settle is running.
    Initializing,
    Running,
    Closed,
}

/// Notifications a model sends to its event observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelEvent {
    /// Initialization finished and the model is stable.
    Started,
    /// A microstep finished.
    MicroStep,
    /// A microstep finished and nothing is left to update.
    Step,
    /// A step was requested but no node was scheduled. Gates that detect
    /// multiple drivers check for short circuits on this event.
    CheckBurn,
    Closed,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Microsteps a single `do_step` may take before the circuit is
    /// considered oscillating.
    pub max_microsteps: usize,
    /// Extra microsteps run after `max_microsteps` is exceeded, collecting
    /// the nodes that keep getting scheduled.
    pub oscillation_collect_window: usize,
    /// Seed of the generator that shuffles nodes in noise mode.
    pub noise_seed: u64,
    /// Zero-delay node evaluations a single value change may trigger.
    pub max_zero_delay_evaluations: usize,
    /// Run the collection window in noise mode so a metastable circuit can
    /// settle instead of failing.
    pub recover_from_oscillation: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_microsteps: 1000,
            oscillation_collect_window: 100,
            noise_seed: 0,
            max_zero_delay_evaluations: 100_000,
            recover_from_oscillation: false,
        }
    }
}
