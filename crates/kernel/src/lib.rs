//! Digital Kernel.
//!
//! Event driven simulation of digital logic circuits built from gates,
//! registers and wires. The kernel keeps a circuit's signals stable after
//! every input change and detects what cannot happen in real hardware:
//! combinational feedback loops and oscillation.
//!
//! # Architecture
//!
//! - [`value`] - Immutable [`Value`] snapshots with per-bit high impedance
//! - [`storage`] - [`ObservableValue`] signal cells and the [`ValueStore`] arena
//! - [`node`] - The [`Node`] trait implemented by every gate
//! - [`model`] - The [`Model`] owning the graph and running the scheduler
//! - [`analysis`] - Cycle detection, input dependencies and path length
//! - [`gates`] - Primitive nodes: logic gates, flip-flop, driver, splitter
//! - [`types`] - Arena handles, [`Signal`], events and [`ModelConfig`]
//! - [`error`] - Error types for every failure the kernel reports
//!
//! # Execution Model
//!
//! Each microstep proceeds in two phases over the nodes scheduled by the
//! previous one:
//!
//! 1. **Read** - every scheduled node latches its inputs
//! 2. **Write** - every scheduled node writes its outputs; changed values
//!    schedule their observers for the next microstep
//!
//! [`Model::do_step`] repeats microsteps until nothing is scheduled.
//!
//! # Example
//!
//! ```
//! use digital_kernel::gates::{Gate, LogicOp};
//! use digital_kernel::Model;
//!
//! let mut model = Model::new();
//! let a = model.create_value("A", 1)?;
//! let b = model.create_value("B", 1)?;
//! let y = model.create_value("Y", 1)?;
//! let and = Gate::new(&model, LogicOp::And, &[a, b], y)?;
//! model.add(and)?;
//! model.init(false)?;
//!
//! model.set_bool(a, true)?;
//! model.set_bool(b, true)?;
//! model.do_step(false)?;
//! assert!(model.get(y)?.bool());
//! # Ok::<(), digital_kernel::Error>(())
//! ```

pub mod analysis;
pub mod bits;
pub mod error;
pub mod gates;
pub mod model;
pub mod node;
pub mod storage;
pub mod types;
pub mod value;

pub use analysis::{DependencyAnalyser, PathLenAnalyser, check_for_cycles, has_circles};
pub use error::{CycleError, Error, Result};
pub use model::{EventFn, ListenerFn, Model};
pub use node::{Node, Outputs, PendingWrite};
pub use storage::{ObservableValue, ValueStore};
pub use types::*;
pub use value::Value;
