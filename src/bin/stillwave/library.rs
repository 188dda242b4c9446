//! The built-in track and combination catalog.

use stillwave::{
    dsp::Waveform,
    profile::{Combination, CombinationEntry, LfoSettings, TrackDescriptor, TrackSource, VoiceProfile},
};

fn tone(id: &str, name: &str, frequency: f32, profile: VoiceProfile, volume: f32) -> TrackDescriptor {
    TrackDescriptor {
        id: id.into(),
        display_name: name.into(),
        category: "tones".into(),
        source: TrackSource::Synth {
            base_frequency_hz: frequency,
        },
        profile,
        default_volume: volume,
        duration_secs: None,
    }
}

pub fn tracks() -> Vec<TrackDescriptor> {
    let warm = VoiceProfile {
        levels: vec![1.0, 0.4, 0.2],
        waveforms: vec![Waveform::Sine],
        tremolo: Some(LfoSettings {
            rate_hz: 0.25,
            depth: 0.12,
        }),
        vibrato: None,
        ratios: None,
    };
    let shimmer = VoiceProfile {
        levels: vec![1.0, 0.5, 0.3, 0.15],
        waveforms: vec![Waveform::Sine, Waveform::Triangle],
        tremolo: None,
        vibrato: Some(LfoSettings {
            rate_hz: 5.0,
            depth: 1.5,
        }),
        ratios: None,
    };
    let deep = VoiceProfile {
        levels: vec![1.0, 0.3],
        waveforms: vec![Waveform::Sine],
        tremolo: Some(LfoSettings {
            rate_hz: 0.1,
            depth: 0.2,
        }),
        vibrato: None,
        ratios: Some(vec![1.0, 1.5]),
    };

    vec![
        tone("grounding-432", "Grounding 432 Hz", 432.0, warm.clone(), 0.8),
        tone("heart-528", "Heart 528 Hz", 528.0, shimmer, 0.6),
        tone("deep-rest-174", "Deep Rest 174 Hz", 174.0, deep, 0.7),
        tone("clarity-741", "Clarity 741 Hz", 741.0, warm, 0.5),
    ]
}

pub fn combinations() -> Vec<Combination> {
    vec![
        Combination {
            name: "evening-calm".into(),
            entries: vec![
                CombinationEntry {
                    layer_id: "grounding-432".into(),
                    offset_secs: 0.0,
                },
                CombinationEntry {
                    layer_id: "deep-rest-174".into(),
                    offset_secs: 2.0,
                },
            ],
        },
        Combination {
            name: "morning-focus".into(),
            entries: vec![
                CombinationEntry {
                    layer_id: "clarity-741".into(),
                    offset_secs: 0.0,
                },
                CombinationEntry {
                    layer_id: "heart-528".into(),
                    offset_secs: 1.5,
                },
            ],
        },
    ]
}
