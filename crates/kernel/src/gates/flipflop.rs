//! Edge triggered storage.

use crate::bits;
use crate::error::Result;
use crate::model::Model;
use crate::node::{Node, Outputs};
use crate::storage::ValueStore;
use crate::types::ValueId;

/// D flip-flop capturing its data input on the rising clock edge.
///
/// Only the clock is observed. The data input is read whenever the clock
/// changes but a change of D alone never schedules the flip-flop, so a
/// feedback path through its D input is broken for the graph analyses.
#[derive(Debug)]
pub struct DFlipFlop {
    d: ValueId,
    clock: [ValueId; 1],
    outputs: [ValueId; 2],
    mask: u64,
    last_clock: bool,
    state: u64,
}

impl DFlipFlop {
    /// `q` and `qn` must match the width of `d`; the clock is one bit wide.
    pub fn new(model: &Model, d: ValueId, clock: ValueId, q: ValueId, qn: ValueId) -> Result<Self> {
        let bits = model.cell(d)?.bits();
        model.cell(clock)?.check_bits(clock, 1, None)?;
        model.cell(q)?.check_bits(q, bits, None)?;
        model.cell(qn)?.check_bits(qn, bits, None)?;
        Ok(Self {
            d,
            clock: [clock],
            outputs: [q, qn],
            mask: bits::mask(bits),
            last_clock: false,
            state: 0,
        })
    }

    /// The stored value.
    pub fn state(&self) -> u64 {
        self.state
    }
}

impl Node for DFlipFlop {
    fn read_inputs(&mut self, values: &ValueStore) -> Result<()> {
        let clock = values.bool(self.clock[0])?;
        if clock && !self.last_clock {
            self.state = values.get(self.d)?.value();
        }
        self.last_clock = clock;
        Ok(())
    }

    fn write_outputs(&mut self, out: &mut Outputs) -> Result<()> {
        out.set(self.outputs[0], self.state);
        out.set(self.outputs[1], !self.state & self.mask);
        Ok(())
    }

    fn observed(&self) -> &[ValueId] {
        &self.clock
    }

    fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    fn has_state(&self) -> bool {
        true
    }

    fn description(&self) -> &str {
        "D_FF"
    }
}
