//! Declarative track and voice descriptors.
//!
//! Timbres are data, not code: a `VoiceProfile` describes a harmonic stack
//! and its modulators, and the engine's voice factory interprets it
//! uniformly. New sounds are added by authoring a profile, never by a new
//! synthesis code path. Descriptors are supplied once by the content
//! collaborator at initialization and are immutable afterwards.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::Waveform;

/// A low-frequency modulator: tremolo (on gain) or vibrato (on frequency).
///
/// `depth` is in linear gain for tremolo, in Hz of pitch swing for vibrato.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSettings {
    pub rate_hz: f32,
    pub depth: f32,
}

/// The timbre of a synthesized track: relative overtone levels, a cyclic
/// waveform assignment, optional modulators, and optional non-integer
/// frequency ratios for inharmonic material (e.g. `[1.0, 1.5, 2.0]`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceProfile {
    /// Amplitude level per harmonic, each in [0, 1]. One oscillator is
    /// created per entry.
    pub levels: Vec<f32>,
    /// Waveforms assigned cyclically: harmonic i uses `waveforms[i % len]`.
    pub waveforms: Vec<Waveform>,
    pub tremolo: Option<LfoSettings>,
    pub vibrato: Option<LfoSettings>,
    /// Frequency ratio per harmonic. When absent, harmonic i sounds at
    /// `base_frequency x (i + 1)`.
    pub ratios: Option<Vec<f32>>,
}

impl VoiceProfile {
    /// A single pure sine at the base frequency - the default healing tone.
    pub fn pure_tone() -> Self {
        Self {
            levels: vec![1.0],
            waveforms: vec![Waveform::Sine],
            tremolo: None,
            vibrato: None,
            ratios: None,
        }
    }

    /// Frequency ratio for harmonic `index`.
    pub fn ratio(&self, index: usize) -> f32 {
        self.ratios
            .as_ref()
            .and_then(|ratios| ratios.get(index).copied())
            .unwrap_or((index + 1) as f32)
    }

    /// Waveform for harmonic `index`, assigned cyclically.
    pub fn waveform(&self, index: usize) -> Option<Waveform> {
        if self.waveforms.is_empty() {
            return None;
        }
        Some(self.waveforms[index % self.waveforms.len()])
    }
}

/// Where a layer's sound comes from.
///
/// Sample playback (decoding, buffering) belongs to an external playback
/// element; the engine only owns the sample-backed layer's gain, state,
/// and duration bookkeeping.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSource {
    Synth { base_frequency_hz: f32 },
    Sample { sample_ref: String },
}

/// One logical track the mixer can host as a layer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub id: String,
    pub display_name: String,
    pub category: String,
    pub source: TrackSource,
    pub profile: VoiceProfile,
    /// Starting volume, clamped into [0, 1] at engine initialization.
    pub default_volume: f32,
    /// For non-looping tracks: seconds until playback ends on its own.
    pub duration_secs: Option<f32>,
}

/// One entry of a combination: which layer, and how long after the
/// combination's base delay it starts.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationEntry {
    pub layer_id: String,
    pub offset_secs: f32,
}

/// A named set of layers triggered together with staggered starts.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub name: String,
    pub entries: Vec<CombinationEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ratios_are_integer_harmonics() {
        let profile = VoiceProfile {
            levels: vec![1.0, 0.5, 0.25],
            waveforms: vec![Waveform::Sine],
            tremolo: None,
            vibrato: None,
            ratios: None,
        };

        assert_eq!(profile.ratio(0), 1.0);
        assert_eq!(profile.ratio(1), 2.0);
        assert_eq!(profile.ratio(2), 3.0);
    }

    #[test]
    fn custom_ratios_override_defaults() {
        let profile = VoiceProfile {
            ratios: Some(vec![1.0, 1.5, 2.0]),
            ..VoiceProfile::pure_tone()
        };

        assert_eq!(profile.ratio(1), 1.5);
        // Past the custom list, fall back to the integer series.
        assert_eq!(profile.ratio(3), 4.0);
    }

    #[test]
    fn waveforms_assign_cyclically() {
        let profile = VoiceProfile {
            levels: vec![1.0; 5],
            waveforms: vec![Waveform::Sine, Waveform::Triangle],
            tremolo: None,
            vibrato: None,
            ratios: None,
        };

        assert_eq!(profile.waveform(0), Some(Waveform::Sine));
        assert_eq!(profile.waveform(1), Some(Waveform::Triangle));
        assert_eq!(profile.waveform(4), Some(Waveform::Sine));
    }

    #[test]
    fn empty_waveform_list_yields_none() {
        let profile = VoiceProfile {
            levels: vec![1.0],
            waveforms: vec![],
            tremolo: None,
            vibrato: None,
            ratios: None,
        };

        assert_eq!(profile.waveform(0), None);
    }
}
