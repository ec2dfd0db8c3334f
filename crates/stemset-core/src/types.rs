//! Fundamental audio types shared across the engine
//!
//! Everything downstream of the decode boundary works in 32-bit float
//! stereo frames. `StereoBuffer` is the one buffer type used by the mixer,
//! the stretcher, and the output backend.

use std::ops::{Index, IndexMut};

/// Default sample rate (44.1kHz, the rate separation results are produced at).
/// The actual rate of a loaded track wins; this is only the fallback the
/// output device is asked for when no track is loaded yet.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Number of stems in a separation result (vocals, drums, bass, other)
pub const NUM_STEMS: usize = 4;

/// Audio sample type
pub type Sample = f32;

/// Stem roles produced by source separation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum StemId {
    Vocals = 0,
    Drums = 1,
    Bass = 2,
    Other = 3,
}

impl StemId {
    /// All stems in canonical order
    pub const ALL: [StemId; NUM_STEMS] = [StemId::Vocals, StemId::Drums, StemId::Bass, StemId::Other];

    /// Convert from index (0-3)
    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(StemId::Vocals),
            1 => Some(StemId::Drums),
            2 => Some(StemId::Bass),
            3 => Some(StemId::Other),
            _ => None,
        }
    }

    /// Lowercase role name as used in stem filenames ("vocals", "drums", ...)
    pub fn name(&self) -> &'static str {
        match self {
            StemId::Vocals => "vocals",
            StemId::Drums => "drums",
            StemId::Bass => "bass",
            StemId::Other => "other",
        }
    }
}

impl std::fmt::Display for StemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One stereo frame (left and right samples)
///
/// `#[repr(C)]` guarantees the [left, right] layout so a `&[StereoSample]`
/// can be reinterpreted as interleaved `&[f32]` via bytemuck, which is how
/// buffers are handed to signalsmith-stretch and the output device without
/// per-frame conversion.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// A silent frame
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Duplicate a mono sample into both channels
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Peak amplitude of the frame
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// A buffer of stereo frames
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    frames: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a buffer of `len` silent frames
    pub fn silence(len: usize) -> Self {
        Self {
            frames: vec![StereoSample::silence(); len],
        }
    }

    /// Build from interleaved samples [L, R, L, R, ...]
    pub fn from_interleaved(interleaved: &[Sample]) -> Self {
        assert!(interleaved.len() % 2 == 0, "interleaved data must have even length");
        let frames = interleaved
            .chunks_exact(2)
            .map(|lr| StereoSample::new(lr[0], lr[1]))
            .collect();
        Self { frames }
    }

    /// Build from separate left/right channel slices
    pub fn from_channels(left: &[Sample], right: &[Sample]) -> Self {
        assert_eq!(left.len(), right.len(), "channel lengths must match");
        let frames = left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| StereoSample::new(l, r))
            .collect();
        Self { frames }
    }

    /// Build from a mono signal, duplicated into both channels
    pub fn from_mono(mono: &[Sample]) -> Self {
        Self {
            frames: mono.iter().map(|&v| StereoSample::mono(v)).collect(),
        }
    }

    /// Number of frames
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// The capacity must already cover `new_len`; only the length changes.
    /// Newly exposed frames are silenced.
    #[inline]
    pub fn set_working_len(&mut self, new_len: usize) {
        debug_assert!(
            new_len <= self.frames.capacity(),
            "set_working_len beyond capacity"
        );
        if new_len > self.frames.len() {
            self.frames.resize(new_len, StereoSample::silence());
        } else {
            self.frames.truncate(new_len);
        }
    }

    /// Overwrite every frame with silence
    pub fn fill_silence(&mut self) {
        self.frames.fill(StereoSample::silence());
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.frames
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.frames
    }

    /// Zero-copy view as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.frames)
    }

    /// Zero-copy mutable view as interleaved f32
    #[inline]
    pub fn as_interleaved_mut(&mut self) -> &mut [Sample] {
        bytemuck::cast_slice_mut(&mut self.frames)
    }

    /// Add `other * gain` frame-wise into this buffer
    ///
    /// Lengths must match; this is the mixer's summing primitive.
    pub fn add_scaled(&mut self, other: &StereoBuffer, gain: Sample) {
        assert_eq!(self.len(), other.len(), "buffer lengths must match");
        for (dst, src) in self.frames.iter_mut().zip(other.frames.iter()) {
            *dst += *src * gain;
        }
    }

    /// Multiply every frame by a factor
    pub fn scale(&mut self, factor: Sample) {
        for frame in &mut self.frames {
            *frame *= factor;
        }
    }

    /// Hard-clip every sample to [-1.0, 1.0]
    ///
    /// Applied after summing stems so the composite cannot wrap.
    pub fn clip(&mut self) {
        for frame in &mut self.frames {
            frame.left = frame.left.clamp(-1.0, 1.0);
            frame.right = frame.right.clamp(-1.0, 1.0);
        }
    }

    /// Peak amplitude across the whole buffer
    pub fn peak(&self) -> Sample {
        self.frames.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.frames[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.frames[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sample_arithmetic() {
        let a = StereoSample::new(1.0, 2.0);
        let b = StereoSample::new(0.5, 0.5);

        let sum = a + b;
        assert_eq!(sum.left, 1.5);
        assert_eq!(sum.right, 2.5);

        let scaled = a * 0.5;
        assert_eq!(scaled.left, 0.5);
        assert_eq!(scaled.right, 1.0);
    }

    #[test]
    fn test_from_interleaved_round_trip() {
        let buffer = StereoBuffer::from_interleaved(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer[0].left, 1.0);
        assert_eq!(buffer[1].right, 4.0);
        assert_eq!(buffer.as_interleaved(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_add_scaled_and_clip() {
        let mut out = StereoBuffer::silence(3);
        let src = StereoBuffer::from_mono(&[0.5, 0.8, 1.0]);

        out.add_scaled(&src, 2.0);
        assert_eq!(out[0].left, 1.0);
        assert_eq!(out[2].right, 2.0);

        out.clip();
        assert_eq!(out[1].left, 1.0);
        assert_eq!(out[2].right, 1.0);
    }

    #[test]
    fn test_working_len_preserves_capacity() {
        let mut buf = StereoBuffer::silence(8);
        buf.set_working_len(3);
        assert_eq!(buf.len(), 3);
        buf.set_working_len(8);
        assert_eq!(buf.len(), 8);
        assert_eq!(buf[7], StereoSample::silence());
    }

    #[test]
    fn test_stem_id_enumeration() {
        assert_eq!(StemId::ALL.len(), 4);
        assert_eq!(StemId::Vocals.name(), "vocals");
        assert_eq!(StemId::from_index(1), Some(StemId::Drums));
        assert_eq!(StemId::from_index(4), None);
    }
}
