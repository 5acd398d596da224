//! Input to output dependencies.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::types::{Signal, ValueId};

use super::{MAX_TRAVERSAL_DEPTH, for_each_successor};

/// Every value each input can reach.
///
/// Used to find the inputs an output actually depends on, for example to
/// keep unrelated columns out of a truth table.
#[derive(Debug, Clone)]
pub struct DependencyAnalyser {
    reachable: IndexMap<Signal, IndexSet<ValueId>>,
}

impl DependencyAnalyser {
    /// Analyse the inputs registered with the model.
    pub fn new(model: &Model) -> Result<Self> {
        Self::with_inputs(model, model.inputs())
    }

    pub fn with_inputs(model: &Model, inputs: &[Signal]) -> Result<Self> {
        Self::with_max_depth(model, inputs, MAX_TRAVERSAL_DEPTH)
    }

    /// Walk at most `max_depth` values deep from each input and fail with
    /// [`Error::TraversalDepthExceeded`] past that.
    pub fn with_max_depth(model: &Model, inputs: &[Signal], max_depth: usize) -> Result<Self> {
        let mut reachable = IndexMap::with_capacity(inputs.len());
        for input in inputs {
            let values = reach(model, input.value(), max_depth)?;
            debug!(input = %input, values = values.len(), "dependencies collected");
            reachable.insert(input.clone(), values);
        }
        Ok(Self { reachable })
    }

    /// Inputs whose changes can reach `output`, in input order.
    pub fn get_inputs(&self, output: &Signal) -> Vec<Signal> {
        self.reachable
            .iter()
            .filter(|(_, values)| values.contains(&output.value()))
            .map(|(input, _)| input.clone())
            .collect()
    }

    /// Values reachable from `input`, the input's own value included.
    pub fn reachable(&self, input: &Signal) -> Option<&IndexSet<ValueId>> {
        self.reachable.get(input)
    }
}

fn reach(model: &Model, start: ValueId, max_depth: usize) -> Result<IndexSet<ValueId>> {
    let mut found = IndexSet::new();
    let mut stack = vec![(start, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        if !found.insert(value) {
            continue;
        }
        if depth > max_depth {
            return Err(Error::TraversalDepthExceeded {
                value,
                depth: max_depth,
            });
        }
        for_each_successor(model, value, |_, node| {
            stack.extend(node.outputs().iter().map(|&out| (out, depth + 1)));
            Ok(())
        })?;
    }
    Ok(found)
}
