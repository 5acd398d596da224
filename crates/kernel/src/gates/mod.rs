//! Primitive nodes.
//!
//! A small set of gates that circuit builders and tests wire up directly.
//! Every constructor checks the widths of the values it is given against
//! each other and fails with [`Error::BitsMismatch`](crate::Error::BitsMismatch)
//! before the node is ever added to a model.

mod flipflop;
mod logic;
mod wiring;

pub use flipflop::DFlipFlop;
pub use logic::{Gate, LogicOp, Not};
pub use wiring::{Driver, Splitter};
