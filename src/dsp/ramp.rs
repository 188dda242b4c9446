use crate::MIN_TIME;

/*
Gain Ramps
==========

Setting a gain parameter instantaneously while audio flows through it
produces a step in the output waveform, which the ear hears as a click.
Every audible gain transition in this engine therefore goes through a ramp:

  Voice attack     0 -> level x headroom, linear, over 2 seconds.
                   Long on purpose: healing-tone layers are meant to
                   emerge rather than strike.

  Chime            0 -> peak over 0.1 s linearly, then an exponential
                   decay toward silence over 1.5 s. Exponential because
                   struck objects (bells, bowls) decay exponentially and
                   a linear fade sounds artificial on short sounds.

Live volume changes from the UI are the one exception - they write the
parameter directly (spec'd as responsive rather than smoothed), replacing
any ramp in flight.

The math
--------

Linear: precompute a per-sample step so the target is hit exactly after
`secs x sample_rate` samples.

Exponential: multiply by a constant coefficient each sample:

    coeff = (target / start) ^ (1 / total_samples)

A true exponential never reaches zero, so targets are floored at a small
epsilon internally; when the segment's sample budget is spent the value
snaps to the exact target.
*/

const EXP_FLOOR: f32 = 1e-4;

/// One segment of a piecewise gain trajectory.
///
/// Segments are built against a concrete sample rate and advanced one
/// sample at a time by the owning parameter.
#[derive(Debug, Clone, Copy)]
pub struct RampSegment {
    target: f32,
    remaining: u32,
    kind: SegmentKind,
}

#[derive(Debug, Clone, Copy)]
enum SegmentKind {
    Linear { step: f32 },
    Exponential { coeff: f32 },
}

impl RampSegment {
    /// Linear ramp from `start` to `target` over `secs` seconds.
    pub fn linear(start: f32, target: f32, secs: f32, sample_rate: f32) -> Self {
        let total = (secs.max(MIN_TIME) * sample_rate).round().max(1.0) as u32;
        Self {
            target,
            remaining: total,
            kind: SegmentKind::Linear {
                step: (target - start) / total as f32,
            },
        }
    }

    /// Exponential decay from `start` toward `target` over `secs` seconds.
    pub fn exponential(start: f32, target: f32, secs: f32, sample_rate: f32) -> Self {
        let total = (secs.max(MIN_TIME) * sample_rate).round().max(1.0) as u32;
        let from = start.max(EXP_FLOOR);
        let toward = target.max(EXP_FLOOR);
        Self {
            target,
            remaining: total,
            kind: SegmentKind::Exponential {
                coeff: (toward / from).powf(1.0 / total as f32),
            },
        }
    }

    /// The value this segment settles at when finished.
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Advance `value` by one sample. Returns true when the segment is
    /// finished, at which point `value` holds the exact target.
    pub fn advance(&mut self, value: &mut f32) -> bool {
        match self.kind {
            SegmentKind::Linear { step } => *value += step,
            SegmentKind::Exponential { coeff } => {
                *value = value.max(EXP_FLOOR) * coeff;
            }
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            *value = self.target;
            true
        } else {
            false
        }
    }
}
