//! Block-rate parameter modulation helpers.

/*
Block-Rate Modulation
=====================

Tremolo and vibrato in this engine are low-frequency oscillators wired to
a parameter of another node:

    modulated_value = base_value + (lfo_output x depth)

Parameters update once per audio block rather than per sample:

  Pro: one update per block regardless of block size
  Pro: targets stay simple (a plain f32 parameter, no audio-rate input)
  Con: slight stepping when the block is large and the LFO fast

The modulators here sit well inside the safe zone: tremolo at 2-6 Hz and
vibrato at 4-8 Hz against 256-sample blocks at 48 kHz means 180+ updates
per LFO cycle - far below audibility as steps.

The block's contribution is the average of the LFO's samples over the
block, which is equivalent to sampling the LFO at the block midpoint for
any waveform that is close to linear across the block.
*/

/// Average of one block of samples, used to collapse an LFO block into a
/// single parameter offset.
#[inline]
pub fn block_average(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f32>() / samples.len() as f32
}

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Convert unipolar signal (0.0 to 1.0) to bipolar (-1.0 to +1.0).
#[inline]
pub fn unipolar_to_bipolar(unipolar: f32) -> f32 {
    (unipolar * 2.0) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_constant_block() {
        let block = [0.25; 64];
        assert!((block_average(&block) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn average_of_symmetric_block_is_zero() {
        let block = [1.0, -1.0, 0.5, -0.5];
        assert!(block_average(&block).abs() < 1e-6);
    }

    #[test]
    fn empty_block_averages_to_zero() {
        assert_eq!(block_average(&[]), 0.0);
    }

    #[test]
    fn polarity_conversions_roundtrip() {
        for &val in &[-1.0, -0.5, 0.0, 0.5, 1.0] {
            let roundtrip = unipolar_to_bipolar(bipolar_to_unipolar(val));
            assert!(
                (roundtrip - val).abs() < 1e-6,
                "roundtrip failed for {val}: got {roundtrip}"
            );
        }
    }
}
