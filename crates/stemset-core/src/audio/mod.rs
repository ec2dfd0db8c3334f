//! Cross-platform audio output via CPAL
//!
//! The audio system follows a lock-free design for real-time safety:
//!
//! - **Control thread**: sends commands via lock-free ringbuffer
//! - **Audio thread**: owns the PlayerEngine exclusively, drains commands
//! - **Atomics**: control thread reads playback state via relaxed atomics
//!
//! ```ignore
//! use stemset_core::audio::{start_audio_system, AudioConfig};
//!
//! let result = start_audio_system(&AudioConfig::default())?;
//! result.command_sender.send(EngineCommand::Play)?;
//! let position = result.shared.position();
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;

pub use backend::{start_audio_system, AudioSystemResult, CommandSender};
pub use config::{AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE};
pub use cpal_backend::CpalAudioHandle;
pub use device::{find_device_by_id, get_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
