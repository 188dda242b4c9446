//! Signal multiplication primitives.

/*
Multiplicative Gain Composition
===============================

Every audible path in the engine passes through a chain of gain stages,
and each stage is nothing more than sample-by-sample multiplication:

    harmonic gain      level x 0.15 headroom, ramped in over 2 s
    layer gain         the layer's current volume, set live by the UI
    master gain        master volume, or 0.0 while muted

Because multiplication is commutative and associative, the effective gain
of a playing layer is simply:

    layer_volume x master_volume x (muted ? 0 : 1)

independent of the order the individual setters were called in. That is
the property the mixer's tests pin down, and it is why mute can be
implemented by driving one shared node to zero without touching any
layer's stored volume.

The 0.15 harmonic headroom exists because layers are stacks of up to
half a dozen oscillators each, and several layers play at once; without
it a full combination at unity volumes would clip long before the master
fader came into play.
*/

/// Multiply two signal buffers sample-by-sample into `out`.
///
/// # Panics
/// Debug-asserts that the slices have equal lengths.
#[inline]
pub fn multiply(signal: &[f32], modulator: &[f32], out: &mut [f32]) {
    debug_assert_eq!(signal.len(), modulator.len());
    debug_assert_eq!(signal.len(), out.len());

    for ((o, &s), &m) in out.iter_mut().zip(signal.iter()).zip(modulator.iter()) {
        *o = s * m;
    }
}

/// Multiply a signal by a constant gain factor, in place.
#[inline]
pub fn apply_gain(signal: &mut [f32], gain: f32) {
    for sample in signal.iter_mut() {
        *sample *= gain;
    }
}

/// Accumulate `source` into `out` (mix bus summing).
#[inline]
pub fn accumulate(source: &[f32], out: &mut [f32]) {
    debug_assert_eq!(source.len(), out.len());

    for (o, &s) in out.iter_mut().zip(source.iter()) {
        *o += s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_basic() {
        let signal = [1.0, 0.5, -0.5, -1.0];
        let modulator = [1.0, 0.5, 0.5, 0.0];
        let mut out = [0.0; 4];

        multiply(&signal, &modulator, &mut out);

        assert_eq!(out, [1.0, 0.25, -0.25, 0.0]);
    }

    #[test]
    fn gain_order_does_not_matter() {
        // layer x master must equal master x layer
        let mut a = [0.8, -0.6, 0.4];
        let mut b = [0.8, -0.6, 0.4];

        apply_gain(&mut a, 0.4);
        apply_gain(&mut a, 0.5);

        apply_gain(&mut b, 0.5);
        apply_gain(&mut b, 0.4);

        assert_eq!(a, b);
        assert!((a[0] - 0.8 * 0.2).abs() < 1e-6);
    }

    #[test]
    fn zero_gain_silences() {
        let mut signal = [0.3, -0.7, 0.5];
        apply_gain(&mut signal, 0.0);
        assert_eq!(signal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn accumulate_sums_buses() {
        let mut out = [0.1, 0.2, 0.3];
        accumulate(&[0.4, 0.4, 0.4], &mut out);
        for (o, expected) in out.iter().zip([0.5, 0.6, 0.7]) {
            assert!((o - expected).abs() < 1e-6);
        }
    }
}
