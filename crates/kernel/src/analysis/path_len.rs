//! Critical path length.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::types::{Signal, ValueId};

use super::for_each_successor;

/// Longest chain of delay nodes between an input and any value it reaches.
///
/// Zero-delay nodes pass the depth through unchanged. A value is explored
/// again only when it is reached with a strictly greater depth than before.
#[derive(Debug, Clone, Copy)]
pub struct PathLenAnalyser {
    max_path_len: usize,
}

impl PathLenAnalyser {
    /// Analyse the inputs registered with the model.
    pub fn new(model: &Model) -> Result<Self> {
        Self::with_inputs(model, model.inputs())
    }

    /// A loop through delay nodes would let the depth grow forever. No
    /// acyclic path is longer than the number of nodes, so exceeding it
    /// fails with [`Error::TraversalDepthExceeded`].
    pub fn with_inputs(model: &Model, inputs: &[Signal]) -> Result<Self> {
        let limit = model.node_count();
        let mut max_path_len = 0;
        for input in inputs {
            let mut best: HashMap<ValueId, usize> = HashMap::new();
            let mut stack = vec![(input.value(), 0usize)];
            while let Some((value, depth)) = stack.pop() {
                if best.get(&value).is_some_and(|&d| d >= depth) {
                    continue;
                }
                if depth > limit {
                    return Err(Error::TraversalDepthExceeded {
                        value,
                        depth: limit,
                    });
                }
                best.insert(value, depth);
                max_path_len = max_path_len.max(depth);

                for_each_successor(model, value, |_, node| {
                    let next = if node.has_delay() { depth + 1 } else { depth };
                    stack.extend(node.outputs().iter().map(|&out| (out, next)));
                    Ok(())
                })?;
            }
        }
        debug!(inputs = inputs.len(), max_path_len, "path length computed");
        Ok(Self { max_path_len })
    }

    pub fn max_path_len(&self) -> usize {
        self.max_path_len
    }
}
