//! Audio engine - transport clock, mix engine, command queue
//!
//! The engine is split along the real-time boundary:
//! - Transport: playhead position, play/pause, tempo-scaled advancement
//! - MixEngine: per-stem read/stretch/gain/sum/clip for one block
//! - EngineCommand: lock-free control-to-audio command queue
//! - PlayerEngine: audio-thread owner tying the pieces together

mod command;
mod engine;
mod mixer;
mod transport;

pub use command::*;
pub use engine::*;
pub use mixer::*;
pub use transport::*;

/// Maximum audio block size the engine supports, in frames
///
/// All scratch buffers are sized for this at startup so block processing
/// never allocates.
pub const MAX_BUFFER_SIZE: usize = 8192;
