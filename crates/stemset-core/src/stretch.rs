//! Time-stretching and pitch-shifting via signalsmith-stretch
//!
//! Wraps the signalsmith-stretch library behind the two playback parameters
//! the engine exposes: a tempo multiplier (playback speed, pitch preserved)
//! and a pitch offset in semitones (pitch, speed preserved). Both axes are
//! independent; when both sit at their neutral values the stretcher is
//! bypassed entirely by the mix engine.

use signalsmith_stretch::Stretch;

use crate::types::StereoBuffer;

/// Number of channels (stereo)
const CHANNELS: u32 = 2;

/// Tempo multiplier range (half speed to double speed)
pub const MIN_TEMPO: f64 = 0.5;
pub const MAX_TEMPO: f64 = 2.0;

/// Pitch offset range in semitones (one octave either way)
pub const MIN_PITCH_SEMITONES: i32 = -12;
pub const MAX_PITCH_SEMITONES: i32 = 12;

/// Clamp a tempo multiplier into the supported range
#[inline]
pub fn clamp_tempo(tempo: f64) -> f64 {
    if tempo.is_finite() {
        tempo.clamp(MIN_TEMPO, MAX_TEMPO)
    } else {
        1.0
    }
}

/// Clamp a pitch offset into the supported range
#[inline]
pub fn clamp_pitch(semitones: i32) -> i32 {
    semitones.clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES)
}

/// Per-stem time stretcher
///
/// Each stem runs its own instance so the four streams stay phase-coherent
/// only through shared settings, never shared state. The stretcher is
/// stateful (overlap-add windows); `reset()` must be called on every seek
/// and load so stale window content from the old position is not smeared
/// into the new one.
///
/// Uses zero-copy format conversion - StereoBuffer is reinterpreted as
/// interleaved f32 without any per-frame copying.
pub struct TimeStretcher {
    /// The underlying signalsmith stretcher
    stretcher: Stretch,
    /// Playback speed multiplier (1.0 = original tempo)
    tempo: f64,
    /// Pitch offset in semitones (positive = up, negative = down)
    pitch_semitones: i32,
}

impl TimeStretcher {
    /// Create a new time stretcher for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        let stretcher = Stretch::preset_default(CHANNELS, sample_rate);

        Self {
            stretcher,
            tempo: 1.0,
            pitch_semitones: 0,
        }
    }

    /// Set the tempo multiplier, clamped to [0.5, 2.0]
    ///
    /// tempo > 1.0: faster playback (more source frames per output frame)
    /// tempo < 1.0: slower playback
    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = clamp_tempo(tempo);
    }

    /// Current tempo multiplier
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Set the pitch offset in whole semitones, clamped to [-12, 12]
    pub fn set_pitch_semitones(&mut self, semitones: i32) {
        self.pitch_semitones = clamp_pitch(semitones);
        // None for tonality_limit means no formant limit
        self.stretcher
            .set_transpose_factor_semitones(self.pitch_semitones as f32, None);
    }

    /// Current pitch offset in semitones
    pub fn pitch_semitones(&self) -> i32 {
        self.pitch_semitones
    }

    /// Whether processing would be a no-op at the current settings
    pub fn is_identity(&self) -> bool {
        self.tempo == 1.0 && self.pitch_semitones == 0
    }

    /// How many source frames a block of `output_frames` consumes at the
    /// current tempo, before fractional carry
    pub fn source_frames_for(&self, output_frames: usize) -> f64 {
        output_frames as f64 * self.tempo
    }

    /// Input latency of the stretch window in samples
    pub fn input_latency(&self) -> usize {
        self.stretcher.input_latency()
    }

    /// Output latency of the stretch window in samples
    pub fn output_latency(&self) -> usize {
        self.stretcher.output_latency()
    }

    /// Drop all windowed state; call on seek and on load
    pub fn reset(&mut self) {
        self.stretcher.reset();
    }

    /// Process a variable-size input block into a fixed-size output block
    ///
    /// The caller has already sized `input` according to the tempo (and the
    /// transport's fractional carry), so the stretch ratio is implied by the
    /// size difference. Empty input produces silence.
    ///
    /// Uses zero-copy format conversion via bytemuck - the input/output
    /// buffers are reinterpreted as interleaved f32 without any copying.
    pub fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer) {
        if input.is_empty() {
            output.fill_silence();
            return;
        }

        let input_len = input.len();
        let output_len = output.len();

        let input_interleaved = input.as_interleaved();
        let output_interleaved = output.as_interleaved_mut();

        output_interleaved[..output_len * 2].fill(0.0);

        self.stretcher.process(
            &input_interleaved[..input_len * 2],
            &mut output_interleaved[..output_len * 2],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_SAMPLE_RATE;

    #[test]
    fn test_stretcher_creation() {
        let stretcher = TimeStretcher::new(DEFAULT_SAMPLE_RATE);
        assert_eq!(stretcher.tempo(), 1.0);
        assert_eq!(stretcher.pitch_semitones(), 0);
        assert!(stretcher.is_identity());
        assert!(stretcher.input_latency() > 0);
        assert!(stretcher.output_latency() > 0);
    }

    #[test]
    fn test_tempo_clamped() {
        let mut stretcher = TimeStretcher::new(DEFAULT_SAMPLE_RATE);
        stretcher.set_tempo(3.5);
        assert_eq!(stretcher.tempo(), MAX_TEMPO);
        stretcher.set_tempo(0.1);
        assert_eq!(stretcher.tempo(), MIN_TEMPO);
        stretcher.set_tempo(f64::NAN);
        assert_eq!(stretcher.tempo(), 1.0);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut stretcher = TimeStretcher::new(DEFAULT_SAMPLE_RATE);
        stretcher.set_pitch_semitones(24);
        assert_eq!(stretcher.pitch_semitones(), MAX_PITCH_SEMITONES);
        stretcher.set_pitch_semitones(-13);
        assert_eq!(stretcher.pitch_semitones(), MIN_PITCH_SEMITONES);
        assert!(!stretcher.is_identity());
    }

    #[test]
    fn test_source_frames_scale_with_tempo() {
        let mut stretcher = TimeStretcher::new(DEFAULT_SAMPLE_RATE);
        stretcher.set_tempo(2.0);
        assert_eq!(stretcher.source_frames_for(512), 1024.0);
        stretcher.set_tempo(0.5);
        assert_eq!(stretcher.source_frames_for(512), 256.0);
    }

    #[test]
    fn test_process_fills_output() {
        let mut stretcher = TimeStretcher::new(DEFAULT_SAMPLE_RATE);
        stretcher.set_tempo(1.25);

        let input = StereoBuffer::silence(640);
        let mut output = StereoBuffer::silence(512);
        stretcher.process(&input, &mut output);
        assert_eq!(output.len(), 512);

        // Empty input is silence, not an error
        let empty = StereoBuffer::silence(0);
        stretcher.process(&empty, &mut output);
        assert_eq!(output.peak(), 0.0);
    }
}
