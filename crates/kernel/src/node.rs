//! The unit of computation.
//!
//! A [`Node`] is evaluated in two phases. [`Node::read_inputs`] gets read-only
//! access to the value arena and latches whatever it needs. [`Node::write_outputs`]
//! only gets an [`Outputs`] collector, so a node cannot look at its inputs
//! while writing and cannot write while reading. Within one microstep the
//! model runs every read before any write, which gives every node the same
//! consistent snapshot regardless of iteration order.

use crate::error::Result;
use crate::storage::ValueStore;
use crate::types::ValueId;
use crate::value::Value;

/// A gate, register or any other element driven by the scheduler.
pub trait Node: Send {
    /// Latch the inputs. Must not have side effects on any value.
    fn read_inputs(&mut self, values: &ValueStore) -> Result<()>;

    /// Write the outputs computed from the latched inputs.
    fn write_outputs(&mut self, out: &mut Outputs) -> Result<()>;

    /// Values whose change schedules this node.
    ///
    /// This may be a subset of what the node reads. A register observes its
    /// clock but not its data input, which makes it a delay element for the
    /// graph analyses.
    fn observed(&self) -> &[ValueId];

    /// Values this node drives.
    fn outputs(&self) -> &[ValueId];

    /// True for sequential elements.
    fn has_state(&self) -> bool {
        false
    }

    /// False for zero-delay nodes, which are evaluated as soon as one of
    /// their inputs changes instead of in the next microstep.
    fn has_delay(&self) -> bool {
        true
    }

    /// Short human readable name used in diagnostics, e.g. `AND`.
    fn description(&self) -> &str;
}

/// A write collected from a node's output phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    pub value: ValueId,
    pub raw: u64,
    pub high_z: u64,
}

/// Write-only sink handed to [`Node::write_outputs`].
#[derive(Debug, Default)]
pub struct Outputs {
    writes: Vec<PendingWrite>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `value` with `raw`, clearing any floating bits.
    pub fn set(&mut self, value: ValueId, raw: u64) {
        self.set_with_high_z(value, raw, 0);
    }

    pub fn set_bool(&mut self, value: ValueId, b: bool) {
        self.set(value, u64::from(b));
    }

    /// Let every bit of `value` float.
    pub fn set_high_z(&mut self, value: ValueId) {
        self.set_with_high_z(value, 0, u64::MAX);
    }

    pub fn set_with_high_z(&mut self, value: ValueId, raw: u64, high_z: u64) {
        self.writes.push(PendingWrite { value, raw, high_z });
    }

    /// Copy a snapshot, floating bits included.
    pub fn set_value(&mut self, target: ValueId, v: Value) {
        self.set_with_high_z(target, v.value(), v.high_z_mask());
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.writes.clear();
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, PendingWrite> {
        self.writes.drain(..)
    }
}
