//! Low-level DSP primitives used by the live node graph.
//!
//! These components are allocation-free and realtime-safe, making them safe
//! to embed directly inside graph nodes. They intentionally stay focused on
//! the signal-processing math so the graph layer can handle orchestration,
//! connection topology, and lifecycle.

/// Sample-by-sample multiplication and gain helpers.
pub mod amplify;
/// Block-rate modulation helpers (averaging, polarity conversion).
pub mod modulate;
/// Phase-accumulator oscillator with the engine's waveform set.
pub mod oscillator;
/// Piecewise gain ramps (linear attack, exponential decay).
pub mod ramp;

pub use oscillator::Waveform;
