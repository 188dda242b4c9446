//! The voice factory: declarative profile in, live generator graph out.
//!
//! One generic interpreter replaces per-track synthesis code paths. For
//! each harmonic level the factory creates an oscillator at
//! `base x ratio(i)` with its cyclically assigned waveform and a personal
//! gain ramped from silence to `level x 0.15` over the configured attack.
//! All harmonic gains feed one unity output gain, which is where tremolo
//! attaches; vibrato attaches to the first harmonic's frequency.
//!
//! Handles are registered with the lifecycle registry the instant they are
//! created, so a failure partway through a build releases everything that
//! exists at that moment - no partial graphs persist.

use crate::{
    dsp::Waveform,
    error::EngineError,
    graph::{AudioGraph, NodeId},
    profile::VoiceProfile,
};

use super::lifecycle::{NodeRegistry, OwnerId};

/// Headroom applied to every harmonic so stacked layers do not clip.
pub const HARMONIC_HEADROOM: f32 = 0.15;

/// The realized node set for one playing instance: everything needed to
/// tear the instance down as a unit. Exists iff the owning layer plays.
pub struct ActiveVoice {
    owner: OwnerId,
    nodes: Vec<NodeId>,
    output: Option<NodeId>,
}

impl ActiveVoice {
    /// Voice for a sample-backed track: the audio itself lives in an
    /// external playback element, so there are no generator handles here,
    /// only the owner that keeps lifecycle bookkeeping uniform.
    pub fn external(owner: OwnerId) -> Self {
        Self {
            owner,
            nodes: Vec::new(),
            output: None,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The voice's summed output gain, to be wired into the layer gain.
    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Build one voice from a profile at a base frequency.
///
/// On any mid-build failure every handle created for this call is stopped
/// and disconnected before the error is returned.
pub fn build_voice(
    graph: &mut AudioGraph,
    registry: &mut NodeRegistry,
    profile: &VoiceProfile,
    base_frequency: f32,
    ramp_secs: f32,
) -> Result<ActiveVoice, EngineError> {
    let owner = registry.new_owner();
    match build_inner(graph, registry, owner, profile, base_frequency, ramp_secs) {
        Ok(voice) => Ok(voice),
        Err(err) => {
            let released = registry.release(owner, graph);
            tracing::warn!(%err, released, "voice build failed, partial graph released");
            Err(err)
        }
    }
}

fn build_inner(
    graph: &mut AudioGraph,
    registry: &mut NodeRegistry,
    owner: OwnerId,
    profile: &VoiceProfile,
    base_frequency: f32,
    ramp_secs: f32,
) -> Result<ActiveVoice, EngineError> {
    if profile.levels.is_empty() {
        return Err(EngineError::NodeCreation {
            reason: "voice profile has no harmonic levels".into(),
        });
    }

    let mut nodes = Vec::new();
    let mut track = |registry: &mut NodeRegistry, nodes: &mut Vec<NodeId>, id: NodeId| {
        registry.track(owner, id);
        nodes.push(id);
    };

    let output = graph.create_gain(1.0);
    track(registry, &mut nodes, output);

    let mut first_oscillator = None;
    for (i, &level) in profile.levels.iter().enumerate() {
        let waveform = profile.waveform(i).ok_or_else(|| EngineError::NodeCreation {
            reason: "voice profile has no waveforms".into(),
        })?;

        let oscillator = graph.create_oscillator(waveform, base_frequency * profile.ratio(i))?;
        track(registry, &mut nodes, oscillator);
        first_oscillator.get_or_insert(oscillator);

        let harmonic_gain = graph.create_gain(0.0);
        track(registry, &mut nodes, harmonic_gain);
        graph.connect(oscillator, harmonic_gain)?;
        graph.connect(harmonic_gain, output)?;
        graph.ramp_gain_linear(
            harmonic_gain,
            level.clamp(0.0, 1.0) * HARMONIC_HEADROOM,
            ramp_secs,
        );
        graph.start_oscillator(oscillator)?;
    }

    if let Some(tremolo) = profile.tremolo {
        let lfo = graph.create_oscillator(Waveform::Sine, tremolo.rate_hz)?;
        track(registry, &mut nodes, lfo);
        graph.connect_gain_mod(lfo, output, tremolo.depth)?;
        graph.start_oscillator(lfo)?;
    }

    if let Some(vibrato) = profile.vibrato {
        // The invariant above guarantees at least one harmonic exists.
        if let Some(first) = first_oscillator {
            let lfo = graph.create_oscillator(Waveform::Sine, vibrato.rate_hz)?;
            track(registry, &mut nodes, lfo);
            graph.connect_frequency_mod(lfo, first, vibrato.depth)?;
            graph.start_oscillator(lfo)?;
        }
    }

    Ok(ActiveVoice {
        owner,
        nodes,
        output: Some(output),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::LfoSettings;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn setup() -> (AudioGraph, NodeRegistry) {
        (AudioGraph::new(SAMPLE_RATE), NodeRegistry::new())
    }

    fn stack_profile() -> VoiceProfile {
        VoiceProfile {
            levels: vec![1.0, 0.5, 0.25],
            waveforms: vec![Waveform::Sine, Waveform::Triangle],
            tremolo: None,
            vibrato: None,
            ratios: None,
        }
    }

    #[test]
    fn builds_one_oscillator_and_gain_per_harmonic() {
        let (mut graph, mut registry) = setup();

        let voice = build_voice(&mut graph, &mut registry, &stack_profile(), 100.0, 0.1).unwrap();

        // 3 harmonics x (oscillator + gain) + 1 output gain
        assert_eq!(voice.node_count(), 7);
        assert_eq!(graph.oscillator_count(), 3);
        assert_eq!(graph.node_count(), 7);
        assert!(voice.output().is_some());
    }

    #[test]
    fn modulators_add_lfo_oscillators() {
        let (mut graph, mut registry) = setup();
        let profile = VoiceProfile {
            tremolo: Some(LfoSettings {
                rate_hz: 4.0,
                depth: 0.05,
            }),
            vibrato: Some(LfoSettings {
                rate_hz: 6.0,
                depth: 2.0,
            }),
            ..stack_profile()
        };

        build_voice(&mut graph, &mut registry, &profile, 100.0, 0.1).unwrap();

        // 3 harmonics + tremolo LFO + vibrato LFO
        assert_eq!(graph.oscillator_count(), 5);
    }

    #[test]
    fn empty_levels_fail_without_leaking() {
        let (mut graph, mut registry) = setup();
        let profile = VoiceProfile {
            levels: vec![],
            ..stack_profile()
        };

        let result = build_voice(&mut graph, &mut registry, &profile, 100.0, 0.1);

        assert!(result.is_err());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn missing_waveforms_release_partial_graph() {
        let (mut graph, mut registry) = setup();
        let profile = VoiceProfile {
            waveforms: vec![],
            ..stack_profile()
        };

        // Fails after the output gain already exists; it must not leak.
        let result = build_voice(&mut graph, &mut registry, &profile, 100.0, 0.1);

        assert!(result.is_err());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.oscillator_count(), 0);
    }

    #[test]
    fn invalid_frequency_releases_partial_graph() {
        let (mut graph, mut registry) = setup();
        let profile = VoiceProfile {
            // Second harmonic hits a negative frequency via a bad ratio.
            ratios: Some(vec![1.0, -2.0]),
            levels: vec![1.0, 0.5],
            waveforms: vec![Waveform::Sine],
            tremolo: None,
            vibrato: None,
        };

        let result = build_voice(&mut graph, &mut registry, &profile, 100.0, 0.1);

        assert!(result.is_err());
        assert_eq!(graph.node_count(), 0, "first harmonic's nodes must be released");
    }

    #[test]
    fn custom_ratios_place_harmonics() {
        let (mut graph, mut registry) = setup();
        let profile = VoiceProfile {
            ratios: Some(vec![1.0, 1.5]),
            levels: vec![1.0, 0.8],
            waveforms: vec![Waveform::Sine],
            tremolo: None,
            vibrato: None,
        };

        let voice = build_voice(&mut graph, &mut registry, &profile, 200.0, 0.1).unwrap();

        assert_eq!(graph.oscillator_count(), 2);
        assert_eq!(voice.node_count(), 5);
    }
}
