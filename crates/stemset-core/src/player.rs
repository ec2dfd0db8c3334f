//! StemPlayer - the control-thread surface over the whole system
//!
//! Wraps the audio system, command queue, shared atomics and export service
//! behind ordinary method calls. The player keeps its own copy of the
//! loaded track: the sample `Arc`s are shared with the audio thread while
//! the mix state is mirrored by applying the same clamped values both
//! sides, so offline exports render exactly the live mix state without
//! asking the audio thread anything.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use thiserror::Error;

use crate::audio::{
    start_audio_system, AudioConfig, AudioError, CommandSender, CpalAudioHandle,
};
use crate::engine::{EngineCommand, SharedState};
use crate::export::{ExportJob, ExportKind, ExportProgress, ExportService};
use crate::loader::{self, LoadTrackError};
use crate::stretch::{clamp_pitch, clamp_tempo};
use crate::track::{clamp_master_volume, LoadError, StemMap, Track};
use crate::types::StemId;

/// Errors from control surface operations
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    LoadTrack(#[from] LoadTrackError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    /// The command queue to the audio thread is full
    #[error("engine command queue is full")]
    CommandQueueFull,

    /// Operation requires a loaded track
    #[error("no track loaded")]
    NoTrack,
}

pub type PlayerResult<T> = Result<T, PlayerError>;

/// Synchronized multi-stem player
///
/// One instance per output stream. All methods are non-blocking; playback
/// state reads go through lock-free atomics and commands go through the
/// lock-free queue.
pub struct StemPlayer {
    sender: CommandSender,
    shared: Arc<SharedState>,
    sample_rate: u32,
    /// Control-side copy of the loaded track (shared samples, mirrored state)
    track: Option<Track>,
    master_volume: f32,
    tempo: f64,
    pitch_semitones: i32,
    export: ExportService,
    /// Keeps the output stream alive for the player's lifetime
    _audio: Option<CpalAudioHandle>,
}

impl StemPlayer {
    /// Start the audio system and create a player on top of it
    pub fn new(config: &AudioConfig) -> PlayerResult<Self> {
        let system = start_audio_system(config)?;
        let sample_rate = system.sample_rate;
        let mut player = Self::from_parts(system.command_sender, system.shared, sample_rate);
        player._audio = Some(system.handle);
        Ok(player)
    }

    /// Build a player over an existing command channel, without audio output
    ///
    /// Used for headless operation (offline rendering, tests); the caller
    /// drives the engine's `process` itself.
    pub fn from_parts(
        sender: CommandSender,
        shared: Arc<SharedState>,
        sample_rate: u32,
    ) -> Self {
        Self {
            sender,
            shared,
            sample_rate,
            track: None,
            master_volume: 1.0,
            tempo: 1.0,
            pitch_semitones: 0,
            export: ExportService::new(),
            _audio: None,
        }
    }

    /// Restart the audio system after a device failure
    ///
    /// Builds a fresh output stream and engine, then replays the
    /// control-side state into it: the loaded track (which carries the
    /// gain/mute/solo mirror), master volume, tempo, pitch, and a seek to
    /// the last known position. Playback stays paused; call [`play`]
    /// to resume.
    ///
    /// [`play`]: StemPlayer::play
    pub fn reattach(&mut self, config: &AudioConfig) -> PlayerResult<()> {
        let system = start_audio_system(config)?;
        self.attach(system.command_sender, system.shared, system.sample_rate)?;
        self._audio = Some(system.handle);
        Ok(())
    }

    /// Point the player at a fresh engine and replay its state
    pub fn attach(
        &mut self,
        sender: CommandSender,
        shared: Arc<SharedState>,
        sample_rate: u32,
    ) -> PlayerResult<()> {
        // The old atomics stay readable even after the stream died
        let position = self.shared.position();
        self.sender = sender;
        self.shared = shared;
        self.sample_rate = sample_rate;

        if let Some(track) = self.track.clone() {
            self.send(EngineCommand::LoadTrack(Box::new(track)))?;
            self.send(EngineCommand::SetMasterVolume(self.master_volume))?;
            self.send(EngineCommand::SetTempo(self.tempo))?;
            self.send(EngineCommand::SetPitch(self.pitch_semitones))?;
            self.send(EngineCommand::Seek { frame: position })?;
        }
        Ok(())
    }

    fn send(&mut self, cmd: EngineCommand) -> PlayerResult<()> {
        self.sender.send(cmd).map_err(|_| PlayerError::CommandQueueFull)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True once the output stream has reported a device failure
    ///
    /// Playback state and the loaded track stay intact; call [`reattach`]
    /// to recover.
    ///
    /// [`reattach`]: StemPlayer::reattach
    pub fn has_device_error(&self) -> bool {
        self.shared.has_device_error()
    }

    // --- Track lifecycle ---

    /// Load a separation result
    ///
    /// Validates the stems, keeps a control-side copy, and hands a second
    /// copy to the audio thread. The engine starts paused at frame zero.
    /// A failed load leaves any previously loaded track untouched.
    pub fn load(&mut self, stems: StemMap) -> PlayerResult<()> {
        let track = Track::new(stems, self.sample_rate)?;
        self.send(EngineCommand::LoadTrack(Box::new(track.clone())))?;
        self.track = Some(track);
        // The engine returns to original speed and pitch on load
        self.tempo = 1.0;
        self.pitch_semitones = 0;
        Ok(())
    }

    /// Decode four stem files and load them
    ///
    /// `paths` follows [`StemId::ALL`] order; every file is resampled to the
    /// engine rate during decoding.
    pub fn load_files(&mut self, paths: &[PathBuf; 4]) -> PlayerResult<()> {
        let track = loader::load_track(paths, self.sample_rate)?;
        self.send(EngineCommand::LoadTrack(Box::new(track.clone())))?;
        self.track = Some(track);
        self.tempo = 1.0;
        self.pitch_semitones = 0;
        Ok(())
    }

    /// Drop the loaded track
    ///
    /// The audio thread's copy only holds `Arc` clones, so sample memory is
    /// freed here on the control thread once both sides have dropped theirs.
    pub fn unload(&mut self) -> PlayerResult<()> {
        self.send(EngineCommand::Unload)?;
        self.track = None;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.track.is_some()
    }

    /// The control-side view of the loaded track
    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    // --- Transport ---

    pub fn play(&mut self) -> PlayerResult<()> {
        self.send(EngineCommand::Play)
    }

    pub fn pause(&mut self) -> PlayerResult<()> {
        self.send(EngineCommand::Pause)
    }

    /// Play if paused, pause if playing
    pub fn toggle_play(&mut self) -> PlayerResult<()> {
        if self.shared.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    /// Seek to an absolute source frame (clamped by the engine)
    pub fn seek_frames(&mut self, frame: usize) -> PlayerResult<()> {
        self.send(EngineCommand::Seek { frame })
    }

    /// Seek to an absolute position in seconds
    pub fn seek_secs(&mut self, secs: f64) -> PlayerResult<()> {
        let frame = (secs.max(0.0) * self.sample_rate as f64) as usize;
        self.seek_frames(frame)
    }

    /// Seek relative to the current position, in seconds
    pub fn seek_relative_secs(&mut self, delta: f64) -> PlayerResult<()> {
        let target = self.position_secs() + delta;
        self.seek_secs(target)
    }

    /// Current playhead in source frames
    pub fn position_frames(&self) -> usize {
        self.shared.position()
    }

    /// Current playhead in seconds
    pub fn position_secs(&self) -> f64 {
        self.shared.position() as f64 / self.sample_rate as f64
    }

    /// Loaded track length in seconds (0.0 when nothing is loaded)
    pub fn duration_secs(&self) -> f64 {
        self.shared.track_len() as f64 / self.sample_rate as f64
    }

    // --- Mix state ---

    /// Set one stem's linear gain, clamped to [0.0, 2.0]
    pub fn set_stem_gain(&mut self, stem: StemId, gain: f32) -> PlayerResult<()> {
        if let Some(track) = &mut self.track {
            track.stem_mut(stem).set_gain(gain);
        }
        self.send(EngineCommand::SetStemGain { stem, gain })
    }

    pub fn set_stem_muted(&mut self, stem: StemId, muted: bool) -> PlayerResult<()> {
        if let Some(track) = &mut self.track {
            track.stem_mut(stem).set_muted(muted);
        }
        self.send(EngineCommand::SetStemMuted { stem, muted })
    }

    pub fn set_stem_soloed(&mut self, stem: StemId, soloed: bool) -> PlayerResult<()> {
        if let Some(track) = &mut self.track {
            track.stem_mut(stem).set_soloed(soloed);
        }
        self.send(EngineCommand::SetStemSoloed { stem, soloed })
    }

    pub fn stem_gain(&self, stem: StemId) -> f32 {
        self.track.as_ref().map_or(1.0, |t| t.stem(stem).gain())
    }

    pub fn is_stem_muted(&self, stem: StemId) -> bool {
        self.track.as_ref().is_some_and(|t| t.stem(stem).is_muted())
    }

    pub fn is_stem_soloed(&self, stem: StemId) -> bool {
        self.track.as_ref().is_some_and(|t| t.stem(stem).is_soloed())
    }

    /// Set the master output volume, clamped to [0.0, 1.0]
    pub fn set_master_volume(&mut self, volume: f32) -> PlayerResult<()> {
        self.master_volume = clamp_master_volume(volume);
        self.send(EngineCommand::SetMasterVolume(volume))
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Return every stem gain and the master volume to 1.0
    pub fn reset_volumes(&mut self) -> PlayerResult<()> {
        for stem in StemId::ALL {
            self.set_stem_gain(stem, 1.0)?;
        }
        self.set_master_volume(1.0)
    }

    /// Clear the solo flag on every stem
    pub fn clear_all_solo(&mut self) -> PlayerResult<()> {
        for stem in StemId::ALL {
            if self.is_stem_soloed(stem) {
                self.set_stem_soloed(stem, false)?;
            }
        }
        Ok(())
    }

    /// Unmute every stem
    pub fn clear_all_mute(&mut self) -> PlayerResult<()> {
        for stem in StemId::ALL {
            if self.is_stem_muted(stem) {
                self.set_stem_muted(stem, false)?;
            }
        }
        Ok(())
    }

    // --- Tempo and pitch ---

    /// Set the playback speed multiplier, clamped to [0.5, 2.0]
    pub fn set_tempo(&mut self, tempo: f64) -> PlayerResult<()> {
        self.tempo = clamp_tempo(tempo);
        self.send(EngineCommand::SetTempo(tempo))
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Set the pitch offset in semitones, clamped to [-12, 12]
    pub fn set_pitch_semitones(&mut self, semitones: i32) -> PlayerResult<()> {
        self.pitch_semitones = clamp_pitch(semitones);
        self.send(EngineCommand::SetPitch(semitones))
    }

    pub fn pitch_semitones(&self) -> i32 {
        self.pitch_semitones
    }

    // --- Export ---

    /// Write one stem's raw PCM to a WAV file in the background
    pub fn export_stem(
        &mut self,
        stem: StemId,
        path: &Path,
    ) -> PlayerResult<Receiver<ExportProgress>> {
        let track = self.track.clone().ok_or(PlayerError::NoTrack)?;
        let jobs = vec![ExportJob {
            kind: ExportKind::Stem(stem),
            path: path.to_path_buf(),
        }];
        Ok(self.export.start_export(track, self.master_volume, jobs))
    }

    /// Render the current mix state to a WAV file in the background
    ///
    /// Applies gains, mutes, solos and master volume exactly as playback
    /// does, at original tempo and pitch.
    pub fn export_mixdown(&mut self, path: &Path) -> PlayerResult<Receiver<ExportProgress>> {
        let track = self.track.clone().ok_or(PlayerError::NoTrack)?;
        let jobs = vec![ExportJob {
            kind: ExportKind::Mixdown,
            path: path.to_path_buf(),
        }];
        Ok(self.export.start_export(track, self.master_volume, jobs))
    }

    /// Cancel any export currently running
    pub fn cancel_export(&self) {
        self.export.cancel();
    }
}
