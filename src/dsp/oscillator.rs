#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Oscillator
==========

The oscillator is the only sound source in this engine: every layer is a
stack of these running at harmonically related frequencies, and every
modulator (tremolo, vibrato) is one running below 20 Hz.

Waveforms and their character:

Sine: a single frequency, no overtones. The default for healing-tone
  layers - a 432 Hz sine is exactly the "pure tone" listeners expect.

Triangle: odd harmonics falling off as 1/n². Slightly warmer than sine
  without becoming buzzy; good for upper harmonics of a pad.

Square: odd harmonics falling off as 1/n. Hollow and present; used
  sparingly, usually well down in a harmonic stack.

Saw: all harmonics falling off as 1/n. The brightest of the set.

Phase accumulation
------------------

Each call advances a phase in [0, 1):

    sample = shape(phase)
    phase += frequency / sample_rate     (wrapped back into [0, 1))

The phase persists across blocks, so a retriggered oscillator continues
where it left off and frequency changes (vibrato) never cause a click.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Saw,
}

/// Allocation-free waveform generator with persistent phase.
pub struct OscillatorBlock {
    waveform: Waveform,
    phase: f32, // in [0, 1)
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(Waveform::Sine)
    }

    pub fn triangle() -> Self {
        Self::new(Waveform::Triangle)
    }

    pub fn square() -> Self {
        Self::new(Waveform::Square)
    }

    pub fn saw() -> Self {
        Self::new(Waveform::Saw)
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Fill `out` with one block of the waveform at `frequency` Hz.
    ///
    /// The sample for index n is computed from the phase *before* the
    /// phase increment, so a fresh sine starts at exactly 0.0.
    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        let step = frequency / sample_rate;

        for sample in out.iter_mut() {
            *sample = shape(self.waveform, self.phase);
            self.phase += step;
            if self.phase >= 1.0 {
                self.phase -= self.phase.floor();
            }
        }
    }

    /// Reset the phase to zero (clean retrigger).
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[inline]
fn shape(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (std::f32::consts::TAU * phase).sin(),
        Waveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Saw => 2.0 * phase - 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn sine_matches_closed_form() {
        let frequency = 432.0;
        let mut osc = OscillatorBlock::sine();
        let mut buffer = vec![0.0f32; 128];

        osc.render(&mut buffer, frequency, SAMPLE_RATE);

        // sample n should be sin(2pi f n / sr)
        for n in [0, 7, 31, 100] {
            let expected = (TAU * frequency * n as f32 / SAMPLE_RATE).sin();
            let actual = buffer[n];
            assert!(
                (actual - expected).abs() < 1e-4,
                "sample {n}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn phase_persists_across_blocks() {
        let frequency = 440.0;
        let mut continuous = OscillatorBlock::sine();
        let mut split = OscillatorBlock::sine();

        let mut whole = vec![0.0f32; 256];
        continuous.render(&mut whole, frequency, SAMPLE_RATE);

        let mut first = vec![0.0f32; 128];
        let mut second = vec![0.0f32; 128];
        split.render(&mut first, frequency, SAMPLE_RATE);
        split.render(&mut second, frequency, SAMPLE_RATE);

        for (i, (&a, &b)) in whole.iter().zip(first.iter().chain(second.iter())).enumerate() {
            assert!(
                (a - b).abs() < 1e-5,
                "block boundary discontinuity at sample {i}: {a} vs {b}"
            );
        }
    }

    #[test]
    fn all_waveforms_stay_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Square,
            Waveform::Saw,
        ] {
            let mut osc = OscillatorBlock::new(waveform);
            let mut buffer = vec![0.0f32; 1024];
            osc.render(&mut buffer, 111.0, SAMPLE_RATE);

            for &sample in &buffer {
                assert!(
                    (-1.0..=1.0).contains(&sample),
                    "{waveform:?} sample {sample} out of range"
                );
            }
        }
    }

    #[test]
    fn triangle_hits_extremes() {
        // At sr/period = 4 samples per cycle the triangle touches -1 and +1.
        let mut osc = OscillatorBlock::triangle();
        let mut buffer = vec![0.0f32; 8];
        osc.render(&mut buffer, SAMPLE_RATE / 4.0, SAMPLE_RATE);

        assert!((buffer[0] - (-1.0)).abs() < 1e-6);
        assert!((buffer[2] - 1.0).abs() < 1e-6);
    }
}
