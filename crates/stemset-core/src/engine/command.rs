//! Lock-free command queue for real-time engine control
//!
//! The control thread sends commands via a bounded lock-free queue and the
//! audio thread drains them at block boundaries. Neither side ever blocks,
//! so a slow control thread can never cause an audio dropout and the audio
//! callback never takes a lock.
//!
//! Commands are applied between blocks, never mid-block, so every output
//! block is mixed under a single consistent parameter snapshot.

use crate::track::Track;
use crate::types::StemId;

/// Commands sent from the control thread to the audio thread
///
/// Each variant is one atomic operation on the engine. Parameter values are
/// clamped on the audio side when applied, so a stale or out-of-range value
/// in the queue can never put the engine in an invalid state.
pub enum EngineCommand {
    /// Replace the loaded track
    ///
    /// Boxed to keep the enum pointer-sized in the ringbuffer. The control
    /// thread retains its own clones of the sample `Arc`s, so dropping a
    /// replaced track on the audio thread only decrements refcounts and
    /// never frees sample memory there.
    LoadTrack(Box<Track>),
    /// Drop the loaded track and stop playback
    Unload,

    /// Start playback from the current position
    Play,
    /// Pause, holding the current position
    Pause,
    /// Move the playhead to an absolute source frame
    Seek { frame: usize },

    /// Set one stem's linear gain
    SetStemGain { stem: StemId, gain: f32 },
    /// Mute or unmute one stem
    SetStemMuted { stem: StemId, muted: bool },
    /// Solo or unsolo one stem
    SetStemSoloed { stem: StemId, soloed: bool },
    /// Set the master output volume
    SetMasterVolume(f32),

    /// Set the playback speed multiplier
    SetTempo(f64),
    /// Set the pitch offset in semitones
    SetPitch(i32),
}

/// Capacity of the command queue
///
/// Control surfaces send at most a handful of commands per UI event; 256
/// gives ample headroom for bursts like restoring a full mix state.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Create a new command channel (producer/consumer pair)
///
/// The producer side belongs to the control thread, the consumer side to
/// the audio thread. The channel is bounded at [`COMMAND_QUEUE_CAPACITY`].
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_roundtrip() {
        let (mut tx, mut rx) = command_channel();

        tx.push(EngineCommand::Play).unwrap();
        tx.push(EngineCommand::Seek { frame: 44100 }).unwrap();

        assert!(matches!(rx.pop().unwrap(), EngineCommand::Play));
        assert!(matches!(
            rx.pop().unwrap(),
            EngineCommand::Seek { frame: 44100 }
        ));
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_command_size() {
        // Keep the enum small for cache-efficient queueing; Track is boxed
        // for exactly this reason.
        let size = std::mem::size_of::<EngineCommand>();
        assert!(size <= 24, "EngineCommand is {} bytes, expected <= 24", size);
    }
}
