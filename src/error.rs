//! Error types for the engine and the underlying node graph.
//!
//! The public engine surface never panics: every failure mode is a typed
//! `EngineError` the hosting application can render as a controlled state.
//! No error here is fatal to the surrounding application.

use thiserror::Error;

use crate::graph::NodeId;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures raised by the live node graph itself.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("oscillator frequency must be finite and positive, got {0}")]
    InvalidFrequency(f32),

    #[error("node {0:?} does not exist in the graph")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not a gain node")]
    NotAGain(NodeId),

    #[error("node {0:?} is not an oscillator")]
    NotAnOscillator(NodeId),
}

/// Failures surfaced by the engine's public surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The host environment has no usable audio output. The engine degrades
    /// to a silent no-op and surfaces one user-visible notice.
    #[error("audio context unavailable on this host")]
    ContextUnavailable,

    /// Autoplay policy: the engine is suspended until the host calls
    /// `resume()` from a genuine user-initiated event.
    #[error("playback blocked until resumed from a user gesture")]
    PlaybackBlocked,

    /// A voice could not be fully built. Every handle already created for
    /// the attempt has been stopped and disconnected before this surfaces.
    #[error("voice construction failed: {reason}")]
    NodeCreation { reason: String },

    #[error("unknown layer id: {0}")]
    UnknownLayer(String),

    #[error("unknown combination: {0}")]
    UnknownCombination(String),
}

impl From<GraphError> for EngineError {
    fn from(err: GraphError) -> Self {
        EngineError::NodeCreation {
            reason: err.to_string(),
        }
    }
}
