use std::collections::VecDeque;

use crate::dsp::{oscillator::OscillatorBlock, ramp::RampSegment, Waveform};

/// Opaque handle to one node in the live graph.
///
/// Ids are never reused within a session, so a stale handle held after
/// teardown can only miss - it can never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// A gain parameter with an optional piecewise ramp trajectory.
///
/// `set_value` writes immediately and discards any ramp in flight (live
/// volume changes are spec'd as responsive, not smoothed). Scheduled
/// transitions queue `RampSegment`s that are consumed sample-by-sample
/// during rendering.
pub struct GainParam {
    value: f32,
    segments: VecDeque<RampSegment>,
}

impl GainParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            segments: VecDeque::new(),
        }
    }

    /// Immediate write; cancels any queued ramps.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.segments.clear();
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn push_linear(&mut self, target: f32, secs: f32, sample_rate: f32) {
        let start = self.trajectory_end();
        self.segments
            .push_back(RampSegment::linear(start, target, secs, sample_rate));
    }

    pub fn push_exponential(&mut self, target: f32, secs: f32, sample_rate: f32) {
        let start = self.trajectory_end();
        self.segments
            .push_back(RampSegment::exponential(start, target, secs, sample_rate));
    }

    /// Advance one sample and return the current value.
    pub fn next_sample(&mut self) -> f32 {
        if let Some(segment) = self.segments.front_mut() {
            if segment.advance(&mut self.value) {
                self.segments.pop_front();
            }
        }
        self.value
    }

    /// The value this parameter will settle at once all queued segments
    /// have played out.
    fn trajectory_end(&self) -> f32 {
        self.segments
            .back()
            .map(|segment| segment.target())
            .unwrap_or(self.value)
    }
}

pub(crate) struct OscillatorState {
    pub(crate) osc: OscillatorBlock,
    pub(crate) base_frequency: f32,
    /// (source LFO, depth in Hz) pairs modulating the frequency.
    pub(crate) freq_mods: Vec<(NodeId, f32)>,
    pub(crate) started: bool,
    pub(crate) stopped: bool,
    /// Virtual time at which this oscillator silences itself.
    pub(crate) stop_at: Option<f64>,
}

pub(crate) struct GainState {
    pub(crate) param: GainParam,
    /// (source LFO, linear depth) pairs modulating the gain value.
    pub(crate) mods: Vec<(NodeId, f32)>,
}

pub(crate) enum NodeKind {
    Oscillator(OscillatorState),
    Gain(GainState),
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    /// Audio inputs (meaningful for gain nodes; oscillators are sources).
    pub(crate) inputs: Vec<NodeId>,
    /// The node's output for the block most recently rendered.
    pub(crate) buffer: Vec<f32>,
}

impl Node {
    pub(crate) fn oscillator(waveform: Waveform, frequency: f32) -> Self {
        Self {
            kind: NodeKind::Oscillator(OscillatorState {
                osc: OscillatorBlock::new(waveform),
                base_frequency: frequency,
                freq_mods: Vec::new(),
                started: false,
                stopped: false,
                stop_at: None,
            }),
            inputs: Vec::new(),
            buffer: vec![0.0; crate::MAX_BLOCK_SIZE],
        }
    }

    pub(crate) fn gain(value: f32) -> Self {
        Self {
            kind: NodeKind::Gain(GainState {
                param: GainParam::new(value),
                mods: Vec::new(),
            }),
            inputs: Vec::new(),
            buffer: vec![0.0; crate::MAX_BLOCK_SIZE],
        }
    }

    pub(crate) fn is_oscillator(&self) -> bool {
        matches!(self.kind, NodeKind::Oscillator(_))
    }
}
