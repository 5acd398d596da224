//! Feedback loop detection.
//!
//! A shadow graph is built by walking forward from the root signals and
//! recording, for every node reached, the nodes it was reached from. Nodes
//! are then placed layer by layer: a node is placed once all of its parents
//! are. Whatever can never be placed sits on a loop.
//!
//! Registers do not observe their data input, so a path through one ends
//! there and a ring containing a register is not reported.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{CycleError, Result};
use crate::model::Model;
use crate::types::{NodeId, Signal, ValueId};

use super::for_each_successor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Root,
    Node(NodeId),
}

/// Nodes reachable from the roots with the parents each was reached from.
#[derive(Debug, Default)]
struct ShadowGraph {
    parents: IndexMap<NodeId, Vec<Parent>>,
}

impl ShadowGraph {
    fn build(model: &Model, roots: &[Signal]) -> Result<Self> {
        let mut graph = Self::default();
        let mut visited: HashSet<ValueId> = HashSet::new();
        let mut stack: Vec<(Parent, ValueId)> =
            roots.iter().rev().map(|s| (Parent::Root, s.value())).collect();

        // edges are recorded on every visit, outputs are expanded once
        while let Some((parent, value)) = stack.pop() {
            let first = visited.insert(value);
            for_each_successor(model, value, |id, node| {
                let parents = graph.parents.entry(id).or_default();
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
                if first {
                    for &out in node.outputs().iter().rev() {
                        stack.push((Parent::Node(id), out));
                    }
                }
                Ok(())
            })?;
        }
        Ok(graph)
    }

    /// Place nodes in layers. Layer 0 holds the nodes fed only by roots.
    fn peel(&self) -> std::result::Result<Vec<Vec<NodeId>>, CycleError> {
        let mut placed: HashSet<NodeId> = HashSet::new();
        let mut remaining: Vec<NodeId> = self.parents.keys().copied().collect();
        let mut layers = Vec::new();

        while !remaining.is_empty() {
            let layer: Vec<NodeId> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    self.parents.get(id).is_some_and(|parents| {
                        parents.iter().all(|p| match p {
                            Parent::Root => true,
                            Parent::Node(n) => placed.contains(n),
                        })
                    })
                })
                .collect();

            if layer.is_empty() {
                return Err(CycleError {
                    involved_nodes: remaining,
                });
            }
            placed.extend(layer.iter().copied());
            remaining.retain(|id| !placed.contains(id));
            layers.push(layer);
        }
        Ok(layers)
    }
}

/// True if the graph reachable from `roots` contains a feedback loop
/// without a delay element.
pub fn has_circles(model: &Model, roots: &[Signal]) -> Result<bool> {
    let circles = ShadowGraph::build(model, roots)?.peel().is_err();
    debug!(roots = roots.len(), circles, "cycle check");
    Ok(circles)
}

/// Fails with [`Error::CycleDetected`](crate::Error::CycleDetected) naming
/// the nodes that could not be ordered.
pub fn check_for_cycles(model: &Model, roots: &[Signal]) -> Result<()> {
    ShadowGraph::build(model, roots)?.peel()?;
    Ok(())
}

/// Nodes reachable from `roots` grouped by distance. Every node's parents
/// sit in earlier layers.
pub fn layers(model: &Model, roots: &[Signal]) -> Result<Vec<Vec<NodeId>>> {
    let layers = ShadowGraph::build(model, roots)?.peel()?;
    debug!(layers = layers.len(), "graph layered");
    Ok(layers)
}
