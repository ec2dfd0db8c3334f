//! Track aggregate - four stems that play back in lock-step
//!
//! A `Track` owns one `StemBuffer` per separation role. Sample data is
//! `Arc`-shared and immutable after load; only the per-stem gain/mute/solo
//! state is mutable. The control surface keeps its own `Track` clone for
//! export while the audio thread owns another, so sample buffers are never
//! copied or freed on the audio thread.

use std::sync::Arc;

use thiserror::Error;

use crate::types::{StemId, StereoBuffer, NUM_STEMS};

/// Gain range for a single stem (linear)
pub const MIN_STEM_GAIN: f32 = 0.0;
pub const MAX_STEM_GAIN: f32 = 2.0;

/// Errors rejecting a separation result at load time
///
/// A failed load leaves any previously loaded track untouched.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Stems of one track must all have the same frame count
    #[error("stem '{stem}' has {got} frames, expected {expected}")]
    LengthMismatch {
        stem: StemId,
        got: usize,
        expected: usize,
    },

    /// A track with no audio cannot be loaded
    #[error("separation result contains no audio")]
    Empty,

    /// Sample rate must be a positive frequency
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// A separation result: one decoded PCM buffer per stem role
///
/// This is the boundary type handed in by whatever produced the stems;
/// the engine does not know or care how the separation was performed.
/// Stereo frame layout is fixed by the buffer type, so the channel-count
/// invariant holds by construction.
#[derive(Debug, Clone, Default)]
pub struct StemMap {
    pub vocals: StereoBuffer,
    pub drums: StereoBuffer,
    pub bass: StereoBuffer,
    pub other: StereoBuffer,
}

impl StemMap {
    fn into_buffers(self) -> [StereoBuffer; NUM_STEMS] {
        [self.vocals, self.drums, self.bass, self.other]
    }
}

/// One stem: immutable samples plus mutable mix state
#[derive(Debug, Clone)]
pub struct StemBuffer {
    id: StemId,
    samples: Arc<StereoBuffer>,
    gain: f32,
    muted: bool,
    soloed: bool,
}

impl StemBuffer {
    fn new(id: StemId, samples: Arc<StereoBuffer>) -> Self {
        Self {
            id,
            samples,
            gain: 1.0,
            muted: false,
            soloed: false,
        }
    }

    pub fn id(&self) -> StemId {
        self.id
    }

    /// Shared handle to the immutable sample data
    pub fn samples(&self) -> &Arc<StereoBuffer> {
        &self.samples
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set the stem gain, clamped to [0.0, 2.0]
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(MIN_STEM_GAIN, MAX_STEM_GAIN);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed
    }

    pub fn set_soloed(&mut self, soloed: bool) {
        self.soloed = soloed;
    }

    /// Effective gain after resolving mute/solo/master: mute wins, solo
    /// isolates, master scales.
    ///
    /// Zero when muted, or when another stem is soloed and this one is not.
    #[inline]
    pub fn effective_gain(&self, any_solo: bool, master_volume: f32) -> f32 {
        if self.muted || (any_solo && !self.soloed) {
            0.0
        } else {
            self.gain * master_volume
        }
    }

    /// Copy `out.len()` frames starting at `start_frame` into `out`,
    /// zero-padding past the end of the stem. Never fails; reads beyond
    /// the track boundary simply produce silence.
    pub fn read_into(&self, start_frame: usize, out: &mut StereoBuffer) {
        let data = self.samples.as_slice();
        let avail = data.len().saturating_sub(start_frame);
        let copied = avail.min(out.len());

        let dst = out.as_mut_slice();
        dst[..copied].copy_from_slice(&data[start_frame..start_frame + copied]);
        dst[copied..].fill(crate::types::StereoSample::silence());
    }
}

/// The loaded track: four aligned stems at one sample rate
#[derive(Debug, Clone)]
pub struct Track {
    stems: [StemBuffer; NUM_STEMS],
    sample_rate: u32,
    len_frames: usize,
}

impl Track {
    /// Validate a separation result and build the track
    ///
    /// Rejects the whole load if any stem's length differs from the others.
    pub fn new(map: StemMap, sample_rate: u32) -> Result<Self, LoadError> {
        if sample_rate == 0 {
            return Err(LoadError::InvalidSampleRate(sample_rate));
        }

        let buffers = map.into_buffers();
        let len_frames = buffers[0].len();
        if len_frames == 0 {
            return Err(LoadError::Empty);
        }
        for (idx, buf) in buffers.iter().enumerate() {
            if buf.len() != len_frames {
                return Err(LoadError::LengthMismatch {
                    stem: StemId::ALL[idx],
                    got: buf.len(),
                    expected: len_frames,
                });
            }
        }

        let [vocals, drums, bass, other] = buffers;
        let stems = [
            StemBuffer::new(StemId::Vocals, Arc::new(vocals)),
            StemBuffer::new(StemId::Drums, Arc::new(drums)),
            StemBuffer::new(StemId::Bass, Arc::new(bass)),
            StemBuffer::new(StemId::Other, Arc::new(other)),
        ];

        Ok(Self {
            stems,
            sample_rate,
            len_frames,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Track length in sample-frames
    pub fn len_frames(&self) -> usize {
        self.len_frames
    }

    /// Track duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.len_frames as f64 / self.sample_rate as f64
    }

    pub fn stem(&self, id: StemId) -> &StemBuffer {
        &self.stems[id as usize]
    }

    pub fn stem_mut(&mut self, id: StemId) -> &mut StemBuffer {
        &mut self.stems[id as usize]
    }

    pub fn stems(&self) -> &[StemBuffer; NUM_STEMS] {
        &self.stems
    }

    /// Whether any stem is currently soloed
    pub fn any_soloed(&self) -> bool {
        self.stems.iter().any(|s| s.soloed)
    }

    /// Effective gain of every stem under the current mute/solo/master state
    pub fn effective_gains(&self, master_volume: f32) -> [f32; NUM_STEMS] {
        let any_solo = self.any_soloed();
        std::array::from_fn(|i| self.stems[i].effective_gain(any_solo, master_volume))
    }
}

/// Clamp a master volume to its valid [0.0, 1.0] range
#[inline]
pub fn clamp_master_volume(volume: f32) -> f32 {
    volume.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn constant_map(frames: usize, level: Sample) -> StemMap {
        let buf = StereoBuffer::from_mono(&vec![level; frames]);
        StemMap {
            vocals: buf.clone(),
            drums: buf.clone(),
            bass: buf.clone(),
            other: buf,
        }
    }

    #[test]
    fn test_load_rejects_length_mismatch() {
        let mut map = constant_map(100, 0.1);
        map.bass = StereoBuffer::silence(99);

        let err = Track::new(map, 44100).unwrap_err();
        assert!(matches!(
            err,
            LoadError::LengthMismatch {
                stem: StemId::Bass,
                got: 99,
                expected: 100,
            }
        ));
    }

    #[test]
    fn test_load_rejects_empty_and_bad_rate() {
        assert!(matches!(
            Track::new(StemMap::default(), 44100),
            Err(LoadError::Empty)
        ));
        assert!(matches!(
            Track::new(constant_map(10, 0.0), 0),
            Err(LoadError::InvalidSampleRate(0))
        ));
    }

    #[test]
    fn test_stems_are_aligned_after_load() {
        let track = Track::new(constant_map(256, 0.2), 48000).unwrap();
        assert_eq!(track.len_frames(), 256);
        for stem in track.stems() {
            assert_eq!(stem.samples().len(), 256);
        }
    }

    #[test]
    fn test_effective_gain_mute_wins() {
        let mut track = Track::new(constant_map(16, 0.5), 44100).unwrap();
        track.stem_mut(StemId::Drums).set_muted(true);
        track.stem_mut(StemId::Drums).set_soloed(true);

        // Muted stems are silent even while soloed
        let gains = track.effective_gains(1.0);
        assert_eq!(gains[StemId::Drums as usize], 0.0);
        // Everything else is silenced by the solo
        assert_eq!(gains[StemId::Vocals as usize], 0.0);
    }

    #[test]
    fn test_effective_gain_solo_isolates() {
        let mut track = Track::new(constant_map(16, 0.5), 44100).unwrap();
        track.stem_mut(StemId::Vocals).set_soloed(true);
        track.stem_mut(StemId::Bass).set_gain(1.5);

        let gains = track.effective_gains(0.5);
        assert_eq!(gains[StemId::Vocals as usize], 0.5);
        assert_eq!(gains[StemId::Drums as usize], 0.0);
        assert_eq!(gains[StemId::Bass as usize], 0.0);
    }

    #[test]
    fn test_gain_clamped_on_write() {
        let mut track = Track::new(constant_map(16, 0.5), 44100).unwrap();
        track.stem_mut(StemId::Other).set_gain(5.0);
        assert_eq!(track.stem(StemId::Other).gain(), MAX_STEM_GAIN);
        track.stem_mut(StemId::Other).set_gain(-1.0);
        assert_eq!(track.stem(StemId::Other).gain(), MIN_STEM_GAIN);
    }

    #[test]
    fn test_read_past_end_is_silence() {
        let track = Track::new(constant_map(8, 0.25), 44100).unwrap();
        let mut out = StereoBuffer::silence(6);

        track.stem(StemId::Vocals).read_into(5, &mut out);
        assert_eq!(out[0].left, 0.25);
        assert_eq!(out[2].left, 0.25);
        assert_eq!(out[3].left, 0.0);
        assert_eq!(out[5].right, 0.0);

        // Fully past the end: all silence, no error
        track.stem(StemId::Vocals).read_into(100, &mut out);
        assert_eq!(out.peak(), 0.0);
    }
}
