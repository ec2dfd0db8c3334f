//! Audio system startup surface
//!
//! Lock-free architecture shared with the engine:
//! - Control thread sends commands via ringbuffer
//! - Audio thread owns the PlayerEngine exclusively
//! - Shared atomics for lock-free state reads

use std::sync::Arc;

use crate::engine::{EngineCommand, SharedState};

use super::config::AudioConfig;
use super::error::AudioResult;

/// Result of starting the audio system
///
/// Contains the handles and channels the control thread needs.
pub struct AudioSystemResult {
    /// Handle keeping the stream alive (drop to stop)
    pub handle: super::cpal_backend::CpalAudioHandle,
    /// Command sender for the control thread (lock-free)
    pub command_sender: CommandSender,
    /// Engine state for lock-free reads
    pub shared: Arc<SharedState>,
    /// Sample rate of the audio system
    pub sample_rate: u32,
    /// Actual buffer size in frames
    pub buffer_size: u32,
    /// Audio latency in milliseconds (one-way, output only)
    pub latency_ms: f32,
}

/// Command sender for the control thread
///
/// Wraps the lock-free producer for sending EngineCommand to the audio
/// thread. All operations are non-blocking.
pub struct CommandSender {
    pub(crate) producer: rtrb::Producer<EngineCommand>,
}

impl CommandSender {
    /// Wrap a raw producer, for headless setups that build their own
    /// engine with [`crate::engine::command_channel`]
    pub fn from_producer(producer: rtrb::Producer<EngineCommand>) -> Self {
        Self { producer }
    }

    /// Send a command to the audio engine (non-blocking)
    ///
    /// Returns `Err(cmd)` with the command handed back if the queue is full.
    pub fn send(&mut self, cmd: EngineCommand) -> Result<(), EngineCommand> {
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Whether the queue has space for more commands
    pub fn has_space(&self) -> bool {
        self.producer.slots() > 0
    }
}

/// Start the audio system with the given configuration
pub fn start_audio_system(config: &AudioConfig) -> AudioResult<AudioSystemResult> {
    super::cpal_backend::start_audio_system(config)
}
