//! The audio-thread side of the player
//!
//! `PlayerEngine` is owned exclusively by the audio thread. It drains the
//! command queue at the top of every block, mixes one block, and publishes
//! position/playing state through shared atomics for lock-free readback by
//! the control thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::command::EngineCommand;
use crate::engine::mixer::MixEngine;
use crate::engine::transport::{BlockOutcome, Transport};
use crate::track::{clamp_master_volume, Track};
use crate::types::StereoBuffer;

/// Engine state mirrored into atomics for the control thread
///
/// All loads and stores use relaxed ordering: each value is independently
/// meaningful and slightly stale reads are fine for displays and polling.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Playhead in source frames
    position: AtomicU64,
    /// Loaded track length in source frames (0 when nothing is loaded)
    track_len: AtomicU64,
    playing: AtomicBool,
    loaded: AtomicBool,
    /// Set by the stream error callback; cleared by reattaching
    device_error: AtomicBool,
}

impl SharedState {
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed) as usize
    }

    pub fn track_len(&self) -> usize {
        self.track_len.load(Ordering::Relaxed) as usize
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Relaxed)
    }

    pub fn has_device_error(&self) -> bool {
        self.device_error.load(Ordering::Relaxed)
    }

    pub(crate) fn set_device_error(&self) {
        self.device_error.store(true, Ordering::Relaxed);
    }
}

/// Single-track playback engine, exclusively owned by the audio thread
pub struct PlayerEngine {
    track: Option<Track>,
    transport: Transport,
    mixer: MixEngine,
    master_volume: f32,
    commands: rtrb::Consumer<EngineCommand>,
    shared: Arc<SharedState>,
}

impl PlayerEngine {
    pub fn new(sample_rate: u32, commands: rtrb::Consumer<EngineCommand>) -> Self {
        Self {
            track: None,
            transport: Transport::new(0),
            mixer: MixEngine::new(sample_rate),
            master_volume: 1.0,
            commands,
            shared: Arc::new(SharedState::default()),
        }
    }

    /// Handle for control-thread state polling
    pub fn shared(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    fn load(&mut self, track: Track) {
        self.transport = Transport::new(track.len_frames());
        // A new track starts at original speed and pitch
        self.mixer.set_tempo(1.0);
        self.mixer.set_pitch_semitones(0);
        self.mixer.reset_stretchers();
        self.shared
            .track_len
            .store(track.len_frames() as u64, Ordering::Relaxed);
        self.shared.loaded.store(true, Ordering::Relaxed);
        self.track = Some(track);
    }

    fn unload(&mut self) {
        self.track = None;
        self.transport = Transport::new(0);
        self.shared.track_len.store(0, Ordering::Relaxed);
        self.shared.loaded.store(false, Ordering::Relaxed);
    }

    fn apply(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::LoadTrack(track) => self.load(*track),
            EngineCommand::Unload => self.unload(),
            EngineCommand::Play => self.transport.play(),
            EngineCommand::Pause => self.transport.pause(),
            EngineCommand::Seek { frame } => {
                self.transport.seek(frame);
                // A seek invalidates the stretch windows at the old position
                self.mixer.reset_stretchers();
            }
            EngineCommand::SetStemGain { stem, gain } => {
                if let Some(track) = &mut self.track {
                    track.stem_mut(stem).set_gain(gain);
                }
            }
            EngineCommand::SetStemMuted { stem, muted } => {
                if let Some(track) = &mut self.track {
                    track.stem_mut(stem).set_muted(muted);
                }
            }
            EngineCommand::SetStemSoloed { stem, soloed } => {
                if let Some(track) = &mut self.track {
                    track.stem_mut(stem).set_soloed(soloed);
                }
            }
            EngineCommand::SetMasterVolume(volume) => {
                self.master_volume = clamp_master_volume(volume);
            }
            EngineCommand::SetTempo(tempo) => self.mixer.set_tempo(tempo),
            EngineCommand::SetPitch(semitones) => self.mixer.set_pitch_semitones(semitones),
        }
    }

    /// Drain all pending commands; called at the top of each block
    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.commands.pop() {
            self.apply(cmd);
        }
    }

    fn sync_atomics(&self) {
        self.shared
            .position
            .store(self.transport.position() as u64, Ordering::Relaxed);
        self.shared
            .playing
            .store(self.transport.is_playing(), Ordering::Relaxed);
    }

    /// Produce one block of output
    ///
    /// Applies pending commands, mixes the block (silence when nothing is
    /// loaded or playback is paused), and publishes the resulting state.
    pub fn process(&mut self, output: &mut StereoBuffer) {
        self.process_commands();

        match &self.track {
            Some(track) => {
                let outcome =
                    self.mixer
                        .mix_block(track, &mut self.transport, self.master_volume, output);
                if outcome == BlockOutcome::Ended {
                    log::debug!("end of track at frame {}", self.transport.position());
                }
            }
            None => output.fill_silence(),
        }

        self.sync_atomics();
    }
}
