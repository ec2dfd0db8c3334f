//! Encode boundary - offline renders and 32-bit float WAV output
//!
//! Rendering happens entirely off the audio thread from the control side's
//! copy of the track. Exports apply the current gain/mute/solo/master state
//! but always render at original tempo and pitch.

mod message;
mod service;

pub use message::ExportProgress;
pub use service::{ExportJob, ExportKind, ExportService};

use std::path::Path;

use thiserror::Error;

use crate::track::Track;
use crate::types::{StemId, StereoBuffer};

/// Errors writing a render to disk
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write WAV '{path}': {message}")]
    Encode { path: String, message: String },

    /// Nothing to render (empty track state)
    #[error("no track loaded to export")]
    NoTrack,
}

/// Render the full mix offline: effective gains, summing, hard clip
///
/// Uses the same gain resolution as live playback, so the file matches what
/// the listener hears at unity tempo and zero pitch.
pub fn mixdown(track: &Track, master_volume: f32) -> StereoBuffer {
    let gains = track.effective_gains(master_volume);
    let mut out = StereoBuffer::silence(track.len_frames());

    for (idx, stem) in track.stems().iter().enumerate() {
        out.add_scaled(stem.samples(), gains[idx]);
    }
    out.clip();
    out
}

/// Raw PCM of one stem, unaffected by any mix state
pub fn stem_pcm(track: &Track, stem: StemId) -> &StereoBuffer {
    track.stem(stem).samples()
}

/// Write a stereo buffer as a 32-bit float WAV file
pub fn write_wav(path: &Path, buffer: &StereoBuffer, sample_rate: u32) -> Result<(), ExportError> {
    use hound::{SampleFormat, WavSpec, WavWriter};

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let encode_err = |e: hound::Error| ExportError::Encode {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut writer = WavWriter::create(path, spec).map_err(encode_err)?;
    for &sample in buffer.as_interleaved() {
        writer.write_sample(sample).map_err(encode_err)?;
    }
    writer.finalize().map_err(encode_err)?;

    Ok(())
}
