//! Microstep scheduler.
//!
//! Each microstep swaps the `active` and `next` queues and evaluates every
//! active node. In the default mode all nodes read their inputs before any
//! node writes, so the order of the active list cannot change the result.
//! Noise mode shuffles the list and lets each node read and write in one go,
//! which shakes out gates that rely on an evaluation order.

use indexmap::IndexSet;
use rand::seq::SliceRandom;
use tracing::{error, info, instrument, trace, warn};

use crate::error::{Error, Result};
use crate::types::{ModelEvent, ModelState, NodeId};

use super::Model;

impl Model {
    /// Schedule every node and settle the circuit.
    ///
    /// Returns the number of microsteps needed to stabilize.
    #[instrument(skip(self), name = "model_init")]
    pub fn init(&mut self, noise: bool) -> Result<usize> {
        match self.state {
            ModelState::Building => {}
            ModelState::Closed => return Err(Error::Closed),
            _ => return Err(Error::AlreadyInitialized),
        }

        self.next.clear();
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            slot.version = self.version;
            self.next.push(NodeId(index as u32));
        }
        self.state = ModelState::Initializing;

        let microsteps = self.do_step(noise)?;
        self.state = ModelState::Running;
        info!(
            microsteps,
            nodes = self.nodes.len(),
            stateful = self.stateful_nodes().len(),
            "model stabilized"
        );
        self.fire_event(ModelEvent::Started);
        Ok(microsteps)
    }

    /// True if a node is scheduled for the next microstep.
    pub fn needs_update(&self) -> bool {
        !self.next.is_empty()
    }

    /// Nodes scheduled for the next microstep.
    pub fn nodes_to_update(&self) -> &[NodeId] {
        &self.next
    }

    /// Total number of microsteps taken so far.
    pub fn step_counter(&self) -> u64 {
        self.version
    }

    /// Run microsteps until nothing is left to update.
    ///
    /// Returns the number of microsteps taken. If nothing was scheduled a
    /// [`ModelEvent::CheckBurn`] event is fired and zero is returned.
    ///
    /// After `max_microsteps` the step keeps going for the configured
    /// collection window and then fails with [`Error::Oscillation`], naming
    /// the nodes that were scheduled during the window. With
    /// `recover_from_oscillation` set, the window runs in noise mode, which
    /// lets a metastable circuit fall into one of its stable states.
    #[instrument(skip(self), name = "do_step")]
    pub fn do_step(&mut self, noise: bool) -> Result<usize> {
        if self.state == ModelState::Closed {
            return Err(Error::Closed);
        }
        if !self.needs_update() {
            trace!("nothing to update, checking for burn");
            self.fire_event(ModelEvent::CheckBurn);
            return Ok(0);
        }

        self.counter = 0;
        let limit = self.config.max_microsteps;
        let mut oscillating: Option<IndexSet<NodeId>> = None;
        while self.needs_update() {
            let mut shuffle = noise;
            if self.counter >= limit {
                shuffle |= self.config.recover_from_oscillation;
                let nodes = oscillating.get_or_insert_with(|| {
                    warn!(microsteps = limit, "circuit seems to oscillate, collecting nodes");
                    IndexSet::new()
                });
                nodes.extend(self.next.iter().copied());
                if self.counter >= limit + self.config.oscillation_collect_window {
                    let nodes: Vec<NodeId> = nodes.iter().copied().collect();
                    error!(microsteps = self.counter, nodes = nodes.len(), "circuit oscillates");
                    return Err(Error::Oscillation {
                        microsteps: self.counter,
                        nodes,
                    });
                }
            }
            self.do_micro_step(shuffle)?;
            self.counter += 1;
        }
        Ok(self.counter)
    }

    /// Run a single microstep.
    pub fn do_micro_step(&mut self, noise: bool) -> Result<()> {
        if self.state == ModelState::Closed {
            return Err(Error::Closed);
        }
        self.version += 1;
        std::mem::swap(&mut self.active, &mut self.next);
        self.next.clear();
        trace!(version = self.version, nodes = self.active.len(), noise, "micro step");

        let mut active = std::mem::take(&mut self.active);
        let result = if noise {
            active.shuffle(&mut self.rng);
            self.run_interleaved(&active)
        } else {
            self.run_phased(&active)
        };
        self.active = active;
        result?;

        self.fire_event(ModelEvent::MicroStep);
        if self.next.is_empty() {
            self.fire_event(ModelEvent::Step);
        }
        Ok(())
    }

    fn run_phased(&mut self, active: &[NodeId]) -> Result<()> {
        for &id in active {
            self.read_node(id)?;
        }
        for &id in active {
            self.write_node(id)?;
        }
        Ok(())
    }

    fn run_interleaved(&mut self, active: &[NodeId]) -> Result<()> {
        for &id in active {
            self.read_node(id)?;
            self.write_node(id)?;
        }
        Ok(())
    }

    fn read_node(&mut self, id: NodeId) -> Result<()> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .ok_or(Error::UnknownNode(id))?;
        slot.node
            .read_inputs(&self.values)
            .map_err(|e| e.in_node(id))
    }
}
