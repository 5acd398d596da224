//! Kernel errors.
//!
//! Every failure the kernel can report, from wiring mistakes to oscillating
//! circuits. Each variant carries the identifiers of the nodes and values
//! involved so a front end can highlight the offending circuit elements
//! instead of only showing a message.
//!
//! # Error Categories
//!
//! - **Value errors**: [`Error::HighZRead`], [`Error::BitsMismatch`], [`Error::ConstantModified`]
//! - **Graph errors**: [`Error::Backtrack`], [`Error::TraversalDepthExceeded`], [`Error::CycleDetected`]
//! - **Execution errors**: [`Error::Oscillation`], [`Error::Node`]
//! - **Usage errors**: [`Error::InvalidBits`], [`Error::UnknownValue`], [`Error::UnknownNode`],
//!   [`Error::UnknownListener`], [`Error::AlreadyInitialized`], [`Error::Closed`],
//!   [`Error::InvalidSignal`]
//!
//! Nothing is retried or swallowed. Every error propagates to the caller of
//! the operation that caused it.

use thiserror::Error;

use crate::types::{ListenerId, NodeId, Observer, ValueId};

/// Kernel result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, running or analysing a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A value was created with a width outside `1..=64`.
    #[error("invalid bit width {bits}, must be between 1 and 64")]
    InvalidBits { bits: u8 },

    #[error("unknown value {0}")]
    UnknownValue(ValueId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown listener {0}")]
    UnknownListener(ListenerId),

    /// The numeric value of a floating signal was read.
    ///
    /// `node` is filled in by the model when the read happened inside a
    /// node's input phase.
    #[error("signal {name} is in high impedance state")]
    HighZRead {
        value: ValueId,
        name: String,
        node: Option<NodeId>,
    },

    /// Two values that are wired together declare different widths.
    #[error("bit width mismatch on {value}: expected {expected}, found {found}")]
    BitsMismatch {
        expected: u8,
        found: u8,
        value: ValueId,
        node: Option<NodeId>,
    },

    #[error("constant {name} cannot be modified")]
    ConstantModified { value: ValueId, name: String },

    /// A node was added after the model left its build phase.
    #[error("model is already initialized, nodes can no longer be added")]
    AlreadyInitialized,

    #[error("model is closed")]
    Closed,

    /// A signal was registered with an empty or already used name.
    #[error("name of signal '{name}' is empty or not unique")]
    InvalidSignal { name: String },

    /// A graph walk reached an observer it cannot traverse.
    #[error("cannot traverse past {observer} observing {value}")]
    Backtrack { value: ValueId, observer: Observer },

    /// A bounded graph walk ran out of depth.
    #[error("traversal depth of {depth} exceeded at {value}")]
    TraversalDepthExceeded { value: ValueId, depth: usize },

    /// The observer graph contains a feedback path with no delay element.
    #[error("circuit contains a feedback loop through {} node(s)", nodes.len())]
    CycleDetected { nodes: Vec<NodeId> },

    /// The scheduler did not reach a stable state within its bound.
    ///
    /// `nodes` holds the nodes that kept getting scheduled while the model
    /// watched the oscillation for a little longer.
    #[error("circuit seems to oscillate, still unstable after {microsteps} microsteps")]
    Oscillation {
        microsteps: usize,
        nodes: Vec<NodeId>,
    },

    /// Raised by a node while reading its inputs or writing its outputs.
    #[error("{message}")]
    Node {
        message: String,
        nodes: Vec<NodeId>,
        values: Vec<ValueId>,
    },
}

impl Error {
    /// A node failure naming the values involved. The model adds the
    /// failing node when the error leaves its evaluation.
    pub fn node(message: impl Into<String>, values: impl IntoIterator<Item = ValueId>) -> Self {
        Error::Node {
            message: message.into(),
            nodes: Vec::new(),
            values: values.into_iter().collect(),
        }
    }

    /// Attribute this error to `id` unless it already names a node.
    pub fn in_node(mut self, id: NodeId) -> Self {
        match &mut self {
            Error::HighZRead { node, .. } | Error::BitsMismatch { node, .. } => {
                node.get_or_insert(id);
            }
            Error::Node { nodes, .. } => {
                if !nodes.contains(&id) {
                    nodes.push(id);
                }
            }
            _ => {}
        }
        self
    }

    /// Nodes this error refers to.
    pub fn nodes(&self) -> Vec<NodeId> {
        match self {
            Error::UnknownNode(id) => vec![*id],
            Error::HighZRead { node, .. } | Error::BitsMismatch { node, .. } => {
                node.iter().copied().collect()
            }
            Error::Backtrack {
                observer: Observer::Node(id),
                ..
            } => vec![*id],
            Error::CycleDetected { nodes }
            | Error::Oscillation { nodes, .. }
            | Error::Node { nodes, .. } => nodes.clone(),
            _ => Vec::new(),
        }
    }

    /// Values this error refers to.
    pub fn values(&self) -> Vec<ValueId> {
        match self {
            Error::UnknownValue(id) => vec![*id],
            Error::HighZRead { value, .. }
            | Error::BitsMismatch { value, .. }
            | Error::ConstantModified { value, .. }
            | Error::Backtrack { value, .. }
            | Error::TraversalDepthExceeded { value, .. } => vec![*value],
            Error::Node { values, .. } => values.clone(),
            _ => Vec::new(),
        }
    }
}

/// Failure of the layer peeling pass.
///
/// Holds the nodes that could never be placed because each of them waits on
/// a parent that is itself unplaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub involved_nodes: Vec<NodeId>,
}

impl From<CycleError> for Error {
    fn from(err: CycleError) -> Self {
        Error::CycleDetected {
            nodes: err.involved_nodes,
        }
    }
}
