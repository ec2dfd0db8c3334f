//! Mix engine - per-block stem summing with tempo/pitch processing
//!
//! All scratch buffers are allocated once at construction with capacity for
//! the largest supported block; per-block work only adjusts working lengths,
//! so the audio thread never allocates.

use crate::engine::transport::{BlockOutcome, Transport};
use crate::engine::MAX_BUFFER_SIZE;
use crate::stretch::TimeStretcher;
use crate::track::Track;
use crate::types::{StereoBuffer, NUM_STEMS};

/// Capacity of the per-stem source read buffer
///
/// At the maximum tempo of 2.0 a block consumes up to twice its length in
/// source frames, plus one frame from the fractional carry.
const SRC_BUFFER_CAPACITY: usize = MAX_BUFFER_SIZE * 2 + 1;

/// Stateful block mixer for one loaded track
///
/// Owns one time stretcher per stem so the four streams pass through
/// identical settings but independent window state. Reading, stretching,
/// gain staging, summing and clipping for one block all happen here;
/// the transport decides how far the playhead moves.
pub struct MixEngine {
    stretchers: [TimeStretcher; NUM_STEMS],
    /// Per-stem source frames read from the track (variable length)
    src_buffers: [StereoBuffer; NUM_STEMS],
    /// Per-stem output frames after stretching (block length)
    stem_buffers: [StereoBuffer; NUM_STEMS],
}

impl MixEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stretchers: std::array::from_fn(|_| TimeStretcher::new(sample_rate)),
            src_buffers: std::array::from_fn(|_| StereoBuffer::silence(SRC_BUFFER_CAPACITY)),
            stem_buffers: std::array::from_fn(|_| StereoBuffer::silence(MAX_BUFFER_SIZE)),
        }
    }

    pub fn tempo(&self) -> f64 {
        self.stretchers[0].tempo()
    }

    pub fn pitch_semitones(&self) -> i32 {
        self.stretchers[0].pitch_semitones()
    }

    /// Set the tempo multiplier on all stems (clamped to [0.5, 2.0])
    pub fn set_tempo(&mut self, tempo: f64) {
        for s in &mut self.stretchers {
            s.set_tempo(tempo);
        }
    }

    /// Set the pitch offset on all stems (clamped to [-12, 12] semitones)
    pub fn set_pitch_semitones(&mut self, semitones: i32) {
        for s in &mut self.stretchers {
            s.set_pitch_semitones(semitones);
        }
    }

    /// Drop all stretch window state; call on seek and on track load
    pub fn reset_stretchers(&mut self) {
        for s in &mut self.stretchers {
            s.reset();
        }
    }

    fn is_identity(&self) -> bool {
        self.stretchers[0].is_identity()
    }

    /// Produce one block of mixed output and advance the transport
    ///
    /// The track is only read, never mutated. At unity tempo and zero pitch
    /// the stretchers are bypassed entirely and stems are copied straight
    /// from the track. Output is hard-clipped to [-1.0, 1.0] after summing.
    pub fn mix_block(
        &mut self,
        track: &Track,
        transport: &mut Transport,
        master_volume: f32,
        output: &mut StereoBuffer,
    ) -> BlockOutcome {
        let frames = output.len();
        debug_assert!(frames <= MAX_BUFFER_SIZE);

        output.fill_silence();
        if !transport.is_playing() || frames == 0 {
            return BlockOutcome::Running;
        }

        let position = transport.position();
        let src_frames = transport.begin_block(frames, self.tempo());
        let gains = track.effective_gains(master_volume);
        let identity = self.is_identity();

        // Every stem goes through its stretcher even at zero effective gain;
        // the window state must stay aligned across stems so an unmute or
        // un-solo picks up phase-coherent with the others.
        for (idx, stem) in track.stems().iter().enumerate() {
            let gain = gains[idx];
            let stem_buf = &mut self.stem_buffers[idx];
            stem_buf.set_working_len(frames);

            if identity {
                // Bypass: read straight into the stem buffer, zero-padded
                // past the track end for the final partial block
                stem.read_into(position, stem_buf);
            } else {
                let src_buf = &mut self.src_buffers[idx];
                src_buf.set_working_len(src_frames);
                stem.read_into(position, src_buf);
                self.stretchers[idx].process(src_buf, stem_buf);
            }

            output.add_scaled(stem_buf, gain);
        }

        output.clip();
        transport.advance(src_frames)
    }
}
