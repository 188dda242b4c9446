//! The live, mutable signal-processing graph.
//!
//! Unlike an ownership-composed voice chain, the soundscape engine needs a
//! *retained* graph: layers come and go while others keep sounding, the UI
//! rewires gain values on live nodes, and teardown must be able to find and
//! release every handle a voice ever created. Nodes are therefore stored in
//! an id-addressed arena with explicit `connect`/`disconnect`, and the leak
//! probes (`node_count`, `oscillator_count`) make lifecycle bugs visible to
//! tests instead of leaving oscillators silently burning CPU.
//!
//! Rendering pulls from the destination: the evaluation order is a
//! post-order walk over audio and modulation edges, recomputed only when
//! the topology changes. Per-node output buffers are preallocated at
//! `MAX_BLOCK_SIZE`, so steady-state rendering does not allocate.

pub mod node;

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    dsp::{amplify::accumulate, modulate::block_average, Waveform},
    error::GraphError,
    MAX_BLOCK_SIZE,
};

use self::node::{Node, NodeKind};
pub use self::node::{GainParam, NodeId};

/// Id-addressed arena of oscillator and gain nodes plus their wiring.
///
/// One graph exists per audio session. The destination (the host's output
/// bus) is implicit: nodes routed to it via `connect_to_destination` are
/// summed into the caller's output buffer each block.
pub struct AudioGraph {
    sample_rate: f32,
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
    destination: Vec<NodeId>,
    eval_order: Vec<NodeId>,
    order_dirty: bool,
    mix_scratch: Vec<f32>,
    now_samples: u64,
}

impl AudioGraph {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            nodes: BTreeMap::new(),
            next_id: 0,
            destination: Vec::new(),
            eval_order: Vec::new(),
            order_dirty: false,
            mix_scratch: vec![0.0; MAX_BLOCK_SIZE],
            now_samples: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Virtual time in seconds: samples rendered so far / sample rate.
    pub fn now(&self) -> f64 {
        self.now_samples as f64 / self.sample_rate as f64
    }

    // ---- construction ----------------------------------------------------

    pub fn create_oscillator(
        &mut self,
        waveform: Waveform,
        frequency: f32,
    ) -> Result<NodeId, GraphError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(GraphError::InvalidFrequency(frequency));
        }
        Ok(self.insert(Node::oscillator(waveform, frequency)))
    }

    pub fn create_gain(&mut self, value: f32) -> NodeId {
        self.insert(Node::gain(value))
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        self.order_dirty = true;
        id
    }

    // ---- wiring ----------------------------------------------------------

    /// Route `src`'s audio output into gain node `dst`.
    pub fn connect(&mut self, src: NodeId, dst: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&src) {
            return Err(GraphError::UnknownNode(src));
        }
        let node = self.nodes.get_mut(&dst).ok_or(GraphError::UnknownNode(dst))?;
        if !matches!(node.kind, NodeKind::Gain(_)) {
            return Err(GraphError::NotAGain(dst));
        }
        if !node.inputs.contains(&src) {
            node.inputs.push(src);
            self.order_dirty = true;
        }
        Ok(())
    }

    /// Route a node straight to the session output bus.
    pub fn connect_to_destination(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode(id));
        }
        if !self.destination.contains(&id) {
            self.destination.push(id);
            self.order_dirty = true;
        }
        Ok(())
    }

    /// Wire an LFO to a gain node's value: effective gain for a block is
    /// `param + block_average(lfo) x depth` (tremolo).
    pub fn connect_gain_mod(
        &mut self,
        lfo: NodeId,
        target: NodeId,
        depth: f32,
    ) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&lfo) {
            return Err(GraphError::UnknownNode(lfo));
        }
        let node = self
            .nodes
            .get_mut(&target)
            .ok_or(GraphError::UnknownNode(target))?;
        match &mut node.kind {
            NodeKind::Gain(gain) => {
                gain.mods.push((lfo, depth));
                self.order_dirty = true;
                Ok(())
            }
            _ => Err(GraphError::NotAGain(target)),
        }
    }

    /// Wire an LFO to an oscillator's frequency: effective frequency for a
    /// block is `base + block_average(lfo) x depth_hz` (vibrato).
    pub fn connect_frequency_mod(
        &mut self,
        lfo: NodeId,
        target: NodeId,
        depth_hz: f32,
    ) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&lfo) {
            return Err(GraphError::UnknownNode(lfo));
        }
        let node = self
            .nodes
            .get_mut(&target)
            .ok_or(GraphError::UnknownNode(target))?;
        match &mut node.kind {
            NodeKind::Oscillator(osc) => {
                osc.freq_mods.push((lfo, depth_hz));
                self.order_dirty = true;
                Ok(())
            }
            _ => Err(GraphError::NotAnOscillator(target)),
        }
    }

    /// Remove every edge touching `id` (audio, modulation, destination).
    /// The node itself stays in the arena until `remove`.
    pub fn disconnect(&mut self, id: NodeId) {
        self.destination.retain(|&d| d != id);
        for node in self.nodes.values_mut() {
            node.inputs.retain(|&input| input != id);
            match &mut node.kind {
                NodeKind::Oscillator(osc) => osc.freq_mods.retain(|&(src, _)| src != id),
                NodeKind::Gain(gain) => gain.mods.retain(|&(src, _)| src != id),
            }
        }
        self.order_dirty = true;
    }

    /// Disconnect and drop a node. Missing ids are ignored: teardown paths
    /// may run twice and must stay idempotent.
    pub fn remove(&mut self, id: NodeId) {
        self.disconnect(id);
        self.nodes.remove(&id);
        self.order_dirty = true;
    }

    // ---- oscillator control ---------------------------------------------

    pub fn start_oscillator(&mut self, id: NodeId) -> Result<(), GraphError> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Oscillator(osc)) => {
                osc.started = true;
                Ok(())
            }
            Some(_) => Err(GraphError::NotAnOscillator(id)),
            None => Err(GraphError::UnknownNode(id)),
        }
    }

    /// Silence an oscillator immediately. Idempotent.
    pub fn stop_oscillator(&mut self, id: NodeId) {
        if let Some(NodeKind::Oscillator(osc)) = self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            osc.stopped = true;
        }
    }

    /// Schedule an oscillator to silence itself at virtual time `when`.
    pub fn stop_oscillator_at(&mut self, id: NodeId, when: f64) {
        if let Some(NodeKind::Oscillator(osc)) = self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            osc.stop_at = Some(when);
        }
    }

    // ---- gain control ----------------------------------------------------

    /// Immediate gain write (cancels ramps). No-op on a missing or non-gain
    /// id: control paths race teardown by design and must not fail.
    pub fn set_gain(&mut self, id: NodeId, value: f32) {
        if let Some(NodeKind::Gain(gain)) = self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            gain.param.set_value(value);
        } else {
            tracing::debug!(?id, "set_gain on absent node ignored");
        }
    }

    pub fn ramp_gain_linear(&mut self, id: NodeId, target: f32, secs: f32) {
        let sample_rate = self.sample_rate;
        if let Some(NodeKind::Gain(gain)) = self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            gain.param.push_linear(target, secs, sample_rate);
        }
    }

    pub fn decay_gain_exponential(&mut self, id: NodeId, target: f32, secs: f32) {
        let sample_rate = self.sample_rate;
        if let Some(NodeKind::Gain(gain)) = self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            gain.param.push_exponential(target, secs, sample_rate);
        }
    }

    pub fn gain_value(&self, id: NodeId) -> Option<f32> {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Gain(gain)) => Some(gain.param.value()),
            _ => None,
        }
    }

    // ---- probes ----------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn oscillator_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_oscillator()).count()
    }

    pub fn connection_count(&self) -> usize {
        let edges: usize = self
            .nodes
            .values()
            .map(|n| {
                n.inputs.len()
                    + match &n.kind {
                        NodeKind::Oscillator(osc) => osc.freq_mods.len(),
                        NodeKind::Gain(gain) => gain.mods.len(),
                    }
            })
            .sum();
        edges + self.destination.len()
    }

    // ---- rendering -------------------------------------------------------

    /// Render one block into `out` and advance the virtual clock.
    ///
    /// Nodes not reachable from the destination (directly or through a
    /// modulation edge) are skipped entirely, matching the rule that a
    /// disconnected generator must have no audible effect.
    pub fn render_block(&mut self, out: &mut [f32]) {
        let len = out.len().min(MAX_BLOCK_SIZE);
        let out = &mut out[..len];

        if self.order_dirty {
            self.rebuild_order();
        }

        let now = self.now();
        let order = std::mem::take(&mut self.eval_order);
        for &id in &order {
            // Take the node out so its buffer can be written while the
            // buffers of already-rendered sources are read.
            let Some(mut node) = self.nodes.remove(&id) else {
                continue;
            };
            match &mut node.kind {
                NodeKind::Oscillator(osc) => {
                    if let Some(when) = osc.stop_at {
                        if now >= when {
                            osc.stopped = true;
                        }
                    }
                    if !osc.started || osc.stopped {
                        node.buffer[..len].fill(0.0);
                    } else {
                        let mut frequency = osc.base_frequency;
                        for &(src, depth) in &osc.freq_mods {
                            if let Some(source) = self.nodes.get(&src) {
                                frequency += block_average(&source.buffer[..len]) * depth;
                            }
                        }
                        let frequency = frequency.max(0.001);
                        osc.osc
                            .render(&mut node.buffer[..len], frequency, self.sample_rate);
                    }
                }
                NodeKind::Gain(gain) => {
                    let scratch = &mut self.mix_scratch[..len];
                    scratch.fill(0.0);
                    for input in &node.inputs {
                        if let Some(source) = self.nodes.get(input) {
                            accumulate(&source.buffer[..len], scratch);
                        }
                    }
                    let mut offset = 0.0;
                    for &(src, depth) in &gain.mods {
                        if let Some(source) = self.nodes.get(&src) {
                            offset += block_average(&source.buffer[..len]) * depth;
                        }
                    }
                    for (o, &s) in node.buffer[..len].iter_mut().zip(scratch.iter()) {
                        let g = (gain.param.next_sample() + offset).max(0.0);
                        *o = s * g;
                    }
                }
            }
            self.nodes.insert(id, node);
        }
        self.eval_order = order;

        out.fill(0.0);
        for id in &self.destination {
            if let Some(node) = self.nodes.get(id) {
                accumulate(&node.buffer[..len], out);
            }
        }

        self.now_samples += len as u64;
    }

    fn rebuild_order(&mut self) {
        fn visit(
            nodes: &BTreeMap<NodeId, Node>,
            id: NodeId,
            seen: &mut BTreeSet<NodeId>,
            order: &mut Vec<NodeId>,
        ) {
            if !seen.insert(id) {
                return;
            }
            let Some(node) = nodes.get(&id) else { return };
            for &input in &node.inputs {
                visit(nodes, input, seen, order);
            }
            match &node.kind {
                NodeKind::Oscillator(osc) => {
                    for &(src, _) in &osc.freq_mods {
                        visit(nodes, src, seen, order);
                    }
                }
                NodeKind::Gain(gain) => {
                    for &(src, _) in &gain.mods {
                        visit(nodes, src, seen, order);
                    }
                }
            }
            order.push(id);
        }

        let mut seen = BTreeSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        for &id in &self.destination {
            visit(&self.nodes, id, &mut seen, &mut order);
        }
        self.eval_order = order;
        self.order_dirty = false;
    }
}
