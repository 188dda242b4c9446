//! Ownership tracking for graph node handles.
//!
//! Every node a voice or chime creates is recorded against an owner the
//! moment it exists, so teardown never depends on the creating code path
//! having finished. Stopping a layer mid-ramp, unwinding a half-built
//! voice, and reaping an expired chime all go through the same
//! `release`: stop every owned oscillator, then disconnect and remove
//! every owned node. An oscillator left started but never released keeps
//! consuming processing resources - that is a defect, and the graph's
//! count probes exist so tests can catch it.

use std::collections::BTreeMap;

use crate::graph::{AudioGraph, NodeId};

/// Handle for one teardown unit (a voice or a chime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OwnerId(u64);

/// Registry mapping owners to every node handle they ever created.
pub struct NodeRegistry {
    owned: BTreeMap<OwnerId, Vec<NodeId>>,
    next_owner: u64,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            owned: BTreeMap::new(),
            next_owner: 0,
        }
    }

    pub fn new_owner(&mut self) -> OwnerId {
        let owner = OwnerId(self.next_owner);
        self.next_owner += 1;
        self.owned.insert(owner, Vec::new());
        owner
    }

    /// Record a node against its owner. Must be called as soon as the node
    /// is created, before any operation that could fail.
    pub fn track(&mut self, owner: OwnerId, node: NodeId) {
        self.owned.entry(owner).or_default().push(node);
    }

    /// Stop, disconnect, and remove every node owned by `owner`.
    /// Idempotent; returns how many nodes were released.
    pub fn release(&mut self, owner: OwnerId, graph: &mut AudioGraph) -> usize {
        let Some(nodes) = self.owned.remove(&owner) else {
            return 0;
        };
        for &node in &nodes {
            graph.stop_oscillator(node); // no-op for gain nodes
        }
        for &node in &nodes {
            graph.remove(node);
        }
        nodes.len()
    }

    /// Release every owner (session teardown).
    pub fn release_all(&mut self, graph: &mut AudioGraph) -> usize {
        let owners: Vec<OwnerId> = self.owned.keys().copied().collect();
        owners
            .into_iter()
            .map(|owner| self.release(owner, graph))
            .sum()
    }

    pub fn owner_count(&self) -> usize {
        self.owned.len()
    }

    pub fn tracked_count(&self, owner: OwnerId) -> usize {
        self.owned.get(&owner).map(Vec::len).unwrap_or(0)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::Waveform;

    #[test]
    fn release_removes_every_tracked_node() {
        let mut graph = AudioGraph::new(1_000.0);
        let mut registry = NodeRegistry::new();

        let owner = registry.new_owner();
        let osc = graph.create_oscillator(Waveform::Sine, 432.0).unwrap();
        let gain = graph.create_gain(0.5);
        registry.track(owner, osc);
        registry.track(owner, gain);
        graph.connect(osc, gain).unwrap();
        graph.connect_to_destination(gain).unwrap();
        graph.start_oscillator(osc).unwrap();

        let released = registry.release(owner, &mut graph);

        assert_eq!(released, 2);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let mut graph = AudioGraph::new(1_000.0);
        let mut registry = NodeRegistry::new();

        let owner = registry.new_owner();
        registry.track(owner, graph.create_gain(1.0));

        assert_eq!(registry.release(owner, &mut graph), 1);
        assert_eq!(registry.release(owner, &mut graph), 0);
    }

    #[test]
    fn owners_release_independently() {
        let mut graph = AudioGraph::new(1_000.0);
        let mut registry = NodeRegistry::new();

        let a = registry.new_owner();
        let b = registry.new_owner();
        registry.track(a, graph.create_gain(1.0));
        registry.track(b, graph.create_gain(1.0));

        registry.release(a, &mut graph);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(registry.tracked_count(b), 1);
    }
}
