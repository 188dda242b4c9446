//! The master bus: one shared gain node every layer feeds.
//!
//! Master volume and mute are both implemented on this single node, so
//! changing either is O(1) regardless of how many layers are wired
//! through it. Mute drives the node to zero while the remembered master
//! volume stays untouched; unmuting restores exactly the pre-mute value
//! and never alters any layer's stored volume.

use crate::graph::{AudioGraph, NodeId};

pub struct Mixer {
    master: NodeId,
    master_volume: f32,
    muted: bool,
}

impl Mixer {
    pub fn new(graph: &mut AudioGraph, initial_volume: f32) -> Self {
        let master_volume = initial_volume.clamp(0.0, 1.0);
        let master = graph.create_gain(master_volume);
        // The node was created on the line above; this cannot fail.
        let _ = graph.connect_to_destination(master);
        Self {
            master,
            master_volume,
            muted: false,
        }
    }

    /// The shared master gain node layers connect into.
    pub fn master(&self) -> NodeId {
        self.master
    }

    pub fn set_master_volume(&mut self, graph: &mut AudioGraph, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        if !self.muted {
            graph.set_gain(self.master, self.master_volume);
        }
    }

    pub fn set_mute(&mut self, graph: &mut AudioGraph, muted: bool) {
        self.muted = muted;
        let value = if muted { 0.0 } else { self.master_volume };
        graph.set_gain(self.master, value);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}
