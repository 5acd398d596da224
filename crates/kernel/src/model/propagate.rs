//! Change notification.
//!
//! A value change is announced to its observers synchronously and in
//! registration order. Delay nodes react by scheduling themselves for the
//! next microstep, zero-delay nodes are evaluated on the spot and listeners
//! are called with the new state.
//!
//! Notification is depth first: when a zero-delay node changes one of its
//! outputs, the observers of that output are served before the remaining
//! observers of the original value. The walk runs on an explicit stack of
//! `(value, next observer)` frames.

use tracing::error;

use crate::error::{Error, Result};
use crate::node::Outputs;
use crate::types::{NodeId, Observer, ValueId};

use super::Model;

impl Model {
    /// Notify every observer of `origin`, following zero-delay nodes.
    pub(super) fn fan_out(&mut self, origin: ValueId) -> Result<()> {
        let mut stack = std::mem::take(&mut self.fan_out_stack);
        stack.clear();
        stack.push((origin, 0));
        let result = self.drain_fan_out(&mut stack);
        self.fan_out_stack = stack;
        result
    }

    fn drain_fan_out(&mut self, stack: &mut Vec<(ValueId, usize)>) -> Result<()> {
        let mut evaluations = 0usize;
        while let Some(frame) = stack.last_mut() {
            let (value, pos) = *frame;
            let Some(&observer) = self.values.cell(value)?.observers().get(pos) else {
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match observer {
                Observer::Node(id) => {
                    let slot = self
                        .nodes
                        .get_mut(id.index())
                        .ok_or(Error::UnknownNode(id))?;
                    if slot.node.has_delay() {
                        if slot.version != self.version {
                            slot.version = self.version;
                            self.next.push(id);
                        }
                    } else {
                        evaluations += 1;
                        if evaluations > self.config.max_zero_delay_evaluations {
                            error!(node = %id, evaluations, "zero delay feedback does not settle");
                            return Err(Error::Oscillation {
                                microsteps: self.counter,
                                nodes: vec![id],
                            });
                        }
                        self.evaluate_now(id, stack)?;
                    }
                }
                Observer::Listener(id) => {
                    let state = self.values.snapshot(value)?;
                    if let Some(Some(callback)) = self.listeners.get_mut(id.0 as usize) {
                        callback(value, state);
                    }
                }
            }
        }
        Ok(())
    }

    /// Run both phases of a zero-delay node and queue its changed outputs
    /// on the notification stack.
    fn evaluate_now(&mut self, id: NodeId, stack: &mut Vec<(ValueId, usize)>) -> Result<()> {
        let mut out = std::mem::take(&mut self.immediate);
        let result = self.evaluate_into(id, &mut out, stack);
        out.clear();
        self.immediate = out;
        result
    }

    fn evaluate_into(
        &mut self,
        id: NodeId,
        out: &mut Outputs,
        stack: &mut Vec<(ValueId, usize)>,
    ) -> Result<()> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .ok_or(Error::UnknownNode(id))?;
        slot.node
            .read_inputs(&self.values)
            .map_err(|e| e.in_node(id))?;
        slot.node.write_outputs(out).map_err(|e| e.in_node(id))?;

        let base = stack.len();
        for write in out.drain() {
            self.check_target(id, write.value)?;
            if self
                .values
                .store(write.value, write.raw, write.high_z)
                .map_err(|e| e.in_node(id))?
            {
                stack.push((write.value, 0));
            }
        }
        // first written output is notified first
        stack[base..].reverse();
        Ok(())
    }

    /// Output phase of a delay node inside a microstep. Every changed
    /// output is announced before the next one is stored.
    pub(super) fn write_node(&mut self, id: NodeId) -> Result<()> {
        let mut out = std::mem::take(&mut self.outputs);
        let result = self.write_node_into(id, &mut out);
        out.clear();
        self.outputs = out;
        result
    }

    fn write_node_into(&mut self, id: NodeId, out: &mut Outputs) -> Result<()> {
        self.nodes
            .get_mut(id.index())
            .ok_or(Error::UnknownNode(id))?
            .node
            .write_outputs(out)
            .map_err(|e| e.in_node(id))?;

        for write in out.drain() {
            self.check_target(id, write.value)?;
            if self
                .values
                .store(write.value, write.raw, write.high_z)
                .map_err(|e| e.in_node(id))?
            {
                self.fan_out(write.value)?;
            }
        }
        Ok(())
    }

    fn check_target(&self, id: NodeId, value: ValueId) -> Result<()> {
        let node = self.node(id)?;
        if node.outputs().contains(&value) {
            return Ok(());
        }
        Err(Error::node(
            format!(
                "{} drives {value}, which is not one of its outputs",
                node.description()
            ),
            [value],
        )
        .in_node(id))
    }
}
