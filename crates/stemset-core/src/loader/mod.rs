//! Decode boundary - audio files in, engine-rate stereo PCM out
//!
//! Decoding happens on the control side, never on the audio thread. Files
//! are decoded with symphonia, upmixed to stereo, and resampled with rubato
//! when the file's rate differs from the engine rate. Past this boundary
//! the engine only ever sees stereo f32 at its own sample rate.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::track::{StemMap, Track};
use crate::types::{StemId, StereoBuffer};

/// Errors from decoding or resampling a stem file
#[derive(Error, Debug)]
pub enum DecodeError {
    /// File could not be opened or read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container or codec not supported, or stream metadata missing
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The file contained no decodable frames
    #[error("no audio data in '{path}'")]
    NoAudio { path: PathBuf },

    /// Resampling to the engine rate failed
    #[error("resampling failed: {0}")]
    Resample(String),
}

/// Decode an audio file to stereo PCM at `target_rate`
///
/// Mono input is duplicated to both channels; streams with more than two
/// channels keep their first two. Resampling only happens when the file's
/// rate differs from the target.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<StereoBuffer, DecodeError> {
    let (samples, file_rate, channels) = decode_raw(path)?;
    if samples.is_empty() {
        return Err(DecodeError::NoAudio {
            path: path.to_path_buf(),
        });
    }

    let stereo = to_stereo(&samples, channels);
    if file_rate == target_rate {
        Ok(stereo)
    } else {
        log::info!(
            "resampling '{}' from {}Hz to {}Hz",
            path.display(),
            file_rate,
            target_rate
        );
        resample(&stereo, file_rate, target_rate)
    }
}

/// Decode four stem files into a validated track
///
/// `paths` follows [`StemId::ALL`] order. All four stems are decoded at
/// `target_rate` so the resulting track needs no further conversion.
pub fn load_track(paths: &[PathBuf; 4], target_rate: u32) -> Result<Track, LoadTrackError> {
    let mut buffers: [StereoBuffer; 4] = Default::default();
    for (idx, path) in paths.iter().enumerate() {
        buffers[idx] = decode_file(path, target_rate).map_err(|source| LoadTrackError::Decode {
            stem: StemId::ALL[idx],
            source,
        })?;
    }

    let [vocals, drums, bass, other] = buffers;
    let map = StemMap {
        vocals,
        drums,
        bass,
        other,
    };
    Track::new(map, target_rate).map_err(LoadTrackError::Validate)
}

/// Errors from loading a full four-stem track
#[derive(Error, Debug)]
pub enum LoadTrackError {
    #[error("failed to decode {stem} stem")]
    Decode {
        stem: StemId,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Validate(crate::track::LoadError),
}

/// Decode a file to interleaved f32 samples
///
/// Returns (samples, sample_rate, channels).
fn decode_raw(path: &Path) -> Result<(Vec<f32>, u32, u16), DecodeError> {
    use std::fs::File;
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = File::open(path).map_err(|e| DecodeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::UnsupportedFormat("No audio track found".to_string()))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnsupportedFormat("Unknown sample rate".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Error decoding packet: {}", e);
                continue;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    Ok((samples, sample_rate, channels))
}

/// Convert interleaved samples of any channel count to stereo frames
fn to_stereo(samples: &[f32], channels: u16) -> StereoBuffer {
    match channels {
        0 | 1 => StereoBuffer::from_mono(samples),
        2 => StereoBuffer::from_interleaved(samples),
        n => {
            // Keep the first two channels, drop the rest
            let n = n as usize;
            let frames = samples.len() / n;
            let mut left = Vec::with_capacity(frames);
            let mut right = Vec::with_capacity(frames);
            for frame in samples.chunks_exact(n) {
                left.push(frame[0]);
                right.push(frame[1]);
            }
            StereoBuffer::from_channels(&left, &right)
        }
    }
}

/// Resample a stereo buffer between two rates with a windowed-sinc resampler
fn resample(input: &StereoBuffer, from_rate: u32, to_rate: u32) -> Result<StereoBuffer, DecodeError> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    const CHUNK: usize = 1024;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler =
        SincFixedIn::<f32>::new(to_rate as f64 / from_rate as f64, 2.0, params, CHUNK, 2)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let in_left: Vec<f32> = input.as_slice().iter().map(|s| s.left).collect();
    let in_right: Vec<f32> = input.as_slice().iter().map(|s| s.right).collect();

    let expected = (input.len() as f64 * to_rate as f64 / from_rate as f64).ceil() as usize;
    let mut out_left: Vec<f32> = Vec::with_capacity(expected);
    let mut out_right: Vec<f32> = Vec::with_capacity(expected);

    let mut pos = 0;
    while pos + CHUNK <= in_left.len() {
        let chunk = [&in_left[pos..pos + CHUNK], &in_right[pos..pos + CHUNK]];
        let out = resampler
            .process(&chunk, None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        out_left.extend_from_slice(&out[0]);
        out_right.extend_from_slice(&out[1]);
        pos += CHUNK;
    }

    // Final partial chunk plus the resampler's internal tail
    let tail = [&in_left[pos..], &in_right[pos..]];
    let out = resampler
        .process_partial(Some(&tail), None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    out_left.extend_from_slice(&out[0]);
    out_right.extend_from_slice(&out[1]);

    let out = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    out_left.extend_from_slice(&out[0]);
    out_right.extend_from_slice(&out[1]);

    Ok(StereoBuffer::from_channels(&out_left, &out_right))
}
