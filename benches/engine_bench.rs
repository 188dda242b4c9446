//! Benchmarks for engine rendering and voice lifecycle.
//!
//! Run with: cargo bench
//!
//! These measure whole-engine block rendering (the audio-callback hot
//! path) at several layer counts, plus the cost of building and tearing
//! down a voice, to ensure both stay well within real-time deadlines.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use stillwave::{
    dsp::Waveform,
    profile::{LfoSettings, TrackDescriptor, TrackSource, VoiceProfile},
    AudioEngine, EngineConfig,
};

/// Common buffer sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn rich_profile() -> VoiceProfile {
    VoiceProfile {
        levels: vec![1.0, 0.5, 0.3, 0.15],
        waveforms: vec![Waveform::Sine, Waveform::Triangle],
        tremolo: Some(LfoSettings {
            rate_hz: 0.25,
            depth: 0.12,
        }),
        vibrato: Some(LfoSettings {
            rate_hz: 5.0,
            depth: 1.5,
        }),
        ratios: None,
    }
}

fn tone(id: &str, frequency: f32) -> TrackDescriptor {
    TrackDescriptor {
        id: id.into(),
        display_name: id.into(),
        category: "tones".into(),
        source: TrackSource::Synth {
            base_frequency_hz: frequency,
        },
        profile: rich_profile(),
        default_volume: 0.7,
        duration_secs: None,
    }
}

fn engine_with_layers(count: usize) -> AudioEngine {
    let tracks = (0..count)
        .map(|i| tone(&format!("tone-{i}"), 174.0 + 64.0 * i as f32))
        .collect();
    let mut engine = AudioEngine::new(EngineConfig::default(), tracks, vec![]);
    for i in 0..count {
        engine
            .start(&format!("tone-{i}"))
            .expect("start in bench setup");
    }
    engine
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/render");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for layers in [1usize, 4, 8] {
            let mut engine = engine_with_layers(layers);
            // Let attack ramps finish so we measure steady state.
            for _ in 0..2_000 {
                engine.render_block(&mut buffer);
            }

            group.bench_with_input(
                BenchmarkId::new(format!("{layers}_layer"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        engine.render_block(black_box(&mut buffer));
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_voice_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/voice_lifecycle");

    let mut engine = AudioEngine::new(EngineConfig::default(), vec![tone("solo", 432.0)], vec![]);

    group.bench_function("start_stop", |b| {
        b.iter(|| {
            engine.start(black_box("solo")).expect("start");
            engine.stop(black_box("solo")).expect("stop");
        })
    });

    group.finish();
}

criterion_group!(benches, bench_render, bench_voice_lifecycle);
criterion_main!(benches);
