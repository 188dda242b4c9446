//! One independently controllable source within the mixer.
//!
//! A layer owns a persistent personal gain node (created at engine
//! initialization, wired into the master bus for the whole session) and,
//! while playing, exactly one `ActiveVoice`. The state machine is
//! `Stopped -> Starting -> Playing -> Stopping -> Stopped`; because
//! teardown walks the lifecycle registry's full handle list, a stop that
//! lands mid-ramp still releases everything the voice had created.

use crate::{
    error::EngineError,
    graph::{AudioGraph, NodeId},
    profile::{TrackDescriptor, TrackSource},
};

use super::{
    lifecycle::NodeRegistry,
    voice::{build_voice, ActiveVoice},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Starting,
    Playing,
    Stopping,
}

pub struct Layer {
    descriptor: TrackDescriptor,
    gain: NodeId,
    volume: f32,
    state: PlayState,
    voice: Option<ActiveVoice>,
    /// Virtual time at which a duration-bound track ends on its own.
    pub(crate) ends_at: Option<f64>,
}

impl Layer {
    /// Create the layer's personal gain and wire it into the master bus.
    pub fn new(graph: &mut AudioGraph, master: NodeId, descriptor: TrackDescriptor) -> Self {
        let volume = descriptor.default_volume.clamp(0.0, 1.0);
        let gain = graph.create_gain(volume);
        let _ = graph.connect(gain, master);
        Self {
            descriptor,
            gain,
            volume,
            state: PlayState::Stopped,
            voice: None,
            ends_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &TrackDescriptor {
        &self.descriptor
    }

    pub fn gain_node(&self) -> NodeId {
        self.gain
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlayState::Starting | PlayState::Playing)
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Build and connect a voice. No-op when already playing, so repeated
    /// starts can never stack duplicate voices.
    pub fn start(
        &mut self,
        graph: &mut AudioGraph,
        registry: &mut NodeRegistry,
        ramp_secs: f32,
        now: f64,
    ) -> Result<(), EngineError> {
        if self.is_playing() {
            return Ok(());
        }
        self.state = PlayState::Starting;

        let voice = match &self.descriptor.source {
            TrackSource::Synth { base_frequency_hz } => {
                match build_voice(
                    graph,
                    registry,
                    &self.descriptor.profile,
                    *base_frequency_hz,
                    ramp_secs,
                ) {
                    Ok(voice) => voice,
                    Err(err) => {
                        self.state = PlayState::Stopped;
                        return Err(err);
                    }
                }
            }
            TrackSource::Sample { sample_ref } => {
                tracing::debug!(layer = %self.descriptor.id, %sample_ref, "sample-backed layer started; decoding is external");
                ActiveVoice::external(registry.new_owner())
            }
        };

        if let Some(output) = voice.output() {
            if let Err(err) = graph.connect(output, self.gain) {
                registry.release(voice.owner(), graph);
                self.state = PlayState::Stopped;
                return Err(err.into());
            }
        }

        self.ends_at = self
            .descriptor
            .duration_secs
            .map(|duration| now + duration as f64);
        self.voice = Some(voice);
        self.state = PlayState::Playing;
        tracing::debug!(layer = %self.descriptor.id, "layer started");
        Ok(())
    }

    /// Stop and release the voice. No-op when already stopped.
    pub fn stop(&mut self, graph: &mut AudioGraph, registry: &mut NodeRegistry) {
        if matches!(self.state, PlayState::Stopped | PlayState::Stopping) {
            return;
        }
        self.state = PlayState::Stopping;
        if let Some(voice) = self.voice.take() {
            let released = registry.release(voice.owner(), graph);
            tracing::debug!(layer = %self.descriptor.id, released, "layer stopped");
        }
        self.ends_at = None;
        self.state = PlayState::Stopped;
    }

    /// Clamp, store, and apply the volume to the live gain immediately.
    /// Returns the clamped value.
    pub fn set_volume(&mut self, graph: &mut AudioGraph, volume: f32) -> f32 {
        self.volume = volume.clamp(0.0, 1.0);
        // The personal gain node persists across play states, so writing
        // it while stopped simply pre-positions the next start.
        graph.set_gain(self.gain, self.volume);
        self.volume
    }
}
