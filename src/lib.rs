pub mod dsp;
pub mod engine; // Layers, mixer, scheduler, and the public engine surface
pub mod error;
pub mod graph; // Live node graph with explicit connect/disconnect lifecycle
pub mod profile; // Declarative track and voice descriptors

pub use engine::{AudioEngine, EngineConfig, EngineEvent};
pub use error::{EngineError, GraphError};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
