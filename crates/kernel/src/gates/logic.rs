//! Combinational gates.

use serde::{Deserialize, Serialize};

use crate::bits;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::node::{Node, Outputs};
use crate::storage::ValueStore;
use crate::types::ValueId;

/// Bitwise operation of a [`Gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
}

impl LogicOp {
    pub fn name(self) -> &'static str {
        match self {
            LogicOp::And => "AND",
            LogicOp::Or => "OR",
            LogicOp::Xor => "XOR",
            LogicOp::Nand => "NAND",
            LogicOp::Nor => "NOR",
            LogicOp::Xnor => "XNOR",
        }
    }

    fn is_inverted(self) -> bool {
        matches!(self, LogicOp::Nand | LogicOp::Nor | LogicOp::Xnor)
    }

    fn combine(self, acc: u64, v: u64) -> u64 {
        match self {
            LogicOp::And | LogicOp::Nand => acc & v,
            LogicOp::Or | LogicOp::Nor => acc | v,
            LogicOp::Xor | LogicOp::Xnor => acc ^ v,
        }
    }
}

/// An n-input gate working bitwise on values of equal width.
#[derive(Debug)]
pub struct Gate {
    op: LogicOp,
    inputs: Vec<ValueId>,
    output: [ValueId; 1],
    mask: u64,
    value: u64,
}

impl Gate {
    pub fn new(model: &Model, op: LogicOp, inputs: &[ValueId], output: ValueId) -> Result<Self> {
        let bits = model.cell(output)?.bits();
        if inputs.is_empty() {
            return Err(Error::node(
                format!("{} gate needs at least one input", op.name()),
                [output],
            ));
        }
        for &input in inputs {
            model.cell(input)?.check_bits(input, bits, None)?;
        }
        Ok(Self {
            op,
            inputs: inputs.to_vec(),
            output: [output],
            mask: bits::mask(bits),
            value: 0,
        })
    }

    pub fn op(&self) -> LogicOp {
        self.op
    }
}

impl Node for Gate {
    fn read_inputs(&mut self, values: &ValueStore) -> Result<()> {
        let mut inputs = self.inputs.iter();
        // non-empty, checked on construction
        let mut acc = match inputs.next() {
            Some(&first) => values.get(first)?.value(),
            None => 0,
        };
        for &input in inputs {
            acc = self.op.combine(acc, values.get(input)?.value());
        }
        let acc = if self.op.is_inverted() { !acc } else { acc };
        self.value = acc & self.mask;
        Ok(())
    }

    fn write_outputs(&mut self, out: &mut Outputs) -> Result<()> {
        out.set(self.output[0], self.value);
        Ok(())
    }

    fn observed(&self) -> &[ValueId] {
        &self.inputs
    }

    fn outputs(&self) -> &[ValueId] {
        &self.output
    }

    fn description(&self) -> &str {
        self.op.name()
    }
}

/// Bitwise inverter.
#[derive(Debug)]
pub struct Not {
    input: [ValueId; 1],
    output: [ValueId; 1],
    mask: u64,
    value: u64,
}

impl Not {
    pub fn new(model: &Model, input: ValueId, output: ValueId) -> Result<Self> {
        let bits = model.cell(output)?.bits();
        model.cell(input)?.check_bits(input, bits, None)?;
        Ok(Self {
            input: [input],
            output: [output],
            mask: bits::mask(bits),
            value: 0,
        })
    }
}

impl Node for Not {
    fn read_inputs(&mut self, values: &ValueStore) -> Result<()> {
        self.value = !values.get(self.input[0])?.value() & self.mask;
        Ok(())
    }

    fn write_outputs(&mut self, out: &mut Outputs) -> Result<()> {
        out.set(self.output[0], self.value);
        Ok(())
    }

    fn observed(&self) -> &[ValueId] {
        &self.input
    }

    fn outputs(&self) -> &[ValueId] {
        &self.output
    }

    fn description(&self) -> &str {
        "NOT"
    }
}
