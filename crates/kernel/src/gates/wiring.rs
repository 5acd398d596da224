//! Tri-state drivers and bus slicing.

use crate::bits;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::node::{Node, Outputs};
use crate::storage::ValueStore;
use crate::types::ValueId;
use crate::value::Value;

/// Tri-state buffer. Passes its input through while `enable` is high and
/// lets the output float otherwise.
#[derive(Debug)]
pub struct Driver {
    inputs: [ValueId; 2],
    output: [ValueId; 1],
    enabled: bool,
    value: Value,
}

impl Driver {
    pub fn new(model: &Model, input: ValueId, enable: ValueId, output: ValueId) -> Result<Self> {
        let bits = model.cell(input)?.bits();
        model.cell(enable)?.check_bits(enable, 1, None)?;
        model.cell(output)?.check_bits(output, bits, None)?;
        Ok(Self {
            inputs: [input, enable],
            output: [output],
            enabled: false,
            value: Value::high_z(bits),
        })
    }
}

impl Node for Driver {
    fn read_inputs(&mut self, values: &ValueStore) -> Result<()> {
        let [input, enable] = self.inputs;
        self.enabled = values.bool(enable)?;
        if self.enabled {
            self.value = values.snapshot(input)?;
        }
        Ok(())
    }

    fn write_outputs(&mut self, out: &mut Outputs) -> Result<()> {
        if self.enabled {
            out.set_value(self.output[0], self.value);
        } else {
            out.set_high_z(self.output[0]);
        }
        Ok(())
    }

    fn observed(&self) -> &[ValueId] {
        &self.inputs
    }

    fn outputs(&self) -> &[ValueId] {
        &self.output
    }

    fn description(&self) -> &str {
        "Driver"
    }
}

/// Zero-delay slice of a wider bus.
///
/// The output carries `output.bits` bits of the input starting at `offset`,
/// floating bits included.
#[derive(Debug)]
pub struct Splitter {
    input: [ValueId; 1],
    output: [ValueId; 1],
    offset: u32,
    mask: u64,
    raw: u64,
    high_z: u64,
}

impl Splitter {
    pub fn new(model: &Model, input: ValueId, offset: u8, output: ValueId) -> Result<Self> {
        let in_bits = model.cell(input)?.bits();
        let out_bits = model.cell(output)?.bits();
        if u16::from(offset) + u16::from(out_bits) > u16::from(in_bits) {
            return Err(Error::node(
                format!(
                    "splitter slice of {out_bits} bits at offset {offset} exceeds the {in_bits} bit input"
                ),
                [input, output],
            ));
        }
        Ok(Self {
            input: [input],
            output: [output],
            offset: u32::from(offset),
            mask: bits::mask(out_bits),
            raw: 0,
            high_z: 0,
        })
    }
}

impl Node for Splitter {
    fn read_inputs(&mut self, values: &ValueStore) -> Result<()> {
        let v = values.snapshot(self.input[0])?;
        self.raw = bits::down(v.value(), self.offset) & self.mask;
        self.high_z = bits::down(v.high_z_mask(), self.offset) & self.mask;
        Ok(())
    }

    fn write_outputs(&mut self, out: &mut Outputs) -> Result<()> {
        out.set_with_high_z(self.output[0], self.raw, self.high_z);
        Ok(())
    }

    fn observed(&self) -> &[ValueId] {
        &self.input
    }

    fn outputs(&self) -> &[ValueId] {
        &self.output
    }

    fn has_delay(&self) -> bool {
        false
    }

    fn description(&self) -> &str {
        "Splitter"
    }
}
