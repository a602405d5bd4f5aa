//! Audio decoding using symphonia
//!
//! Decodes audio files to mono f32 samples at the analysis sample rate.
//! Uses rubato for resampling with proper anti-aliasing. When the source
//! has two channels the stereo pair is retained alongside the mono downmix
//! for stereo-field analysis.

use crate::error::{Result, SampletagError};
use crate::types::{StereoPair, Waveform};
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Target sample rate for analysis (44100 Hz)
///
/// Timbral features (rolloff, brightness, hi-hat detection) need content
/// above 11 kHz, so no half-rate shortcut here.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Maximum file size we'll attempt to decode (512 MB). Sample-library
/// assets are short; anything larger is a mistagged file.
const MAX_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Decode output: mono downmix plus the stereo pair when the source had
/// two channels.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub mono: Waveform,
    pub stereo: Option<StereoPair>,
}

/// Decode an audio file to mono f32 at [`TARGET_SAMPLE_RATE`]
pub fn decode(path: &Path) -> Result<DecodedAudio> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SampletagError::decode_error(path, format!("Failed to stat file: {}", e)))?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(SampletagError::decode_error(
            path,
            format!(
                "File too large ({:.0} MB). Maximum supported size is {} MB.",
                metadata.len() as f64 / (1024.0 * 1024.0),
                MAX_FILE_SIZE / (1024 * 1024)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| SampletagError::decode_error(path, format!("Failed to open file: {}", e)))?;

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
        .map_err(|e| {
            SampletagError::decode_error(path, format!("Failed to probe format: {}", e))
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| SampletagError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_rate = codec_params.sample_rate.unwrap_or(44_100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    debug!(
        "Decoding: {} @ {}Hz, {} channels",
        path.display(),
        source_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| {
            SampletagError::decode_error(path, format!("Failed to create decoder: {}", e))
        })?;

    // Interleaved samples across all packets
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => {
                return Err(SampletagError::decode_error(
                    path,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(SampletagError::decode_error(
                    path,
                    format!("Decode error: {}", e),
                ));
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    if interleaved.is_empty() {
        return Err(SampletagError::EmptyAudio(path.to_path_buf()));
    }

    // Split channels, downmix, and resample everything to the target rate
    let mono = resample_if_needed(&to_mono(&interleaved, channels), source_rate);
    let stereo = if channels >= 2 {
        let (left, right) = split_stereo(&interleaved, channels);
        Some(StereoPair {
            left: resample_if_needed(&left, source_rate),
            right: resample_if_needed(&right, source_rate),
        })
    } else {
        None
    };

    debug!(
        "Decoded {} mono samples ({:.2}s)",
        mono.len(),
        mono.len() as f64 / TARGET_SAMPLE_RATE as f64
    );

    Ok(DecodedAudio {
        mono: Waveform::new(mono, TARGET_SAMPLE_RATE),
        stereo,
    })
}

/// Convert interleaved multi-channel audio to mono by averaging channels
fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Extract the first two channels from interleaved audio
fn split_stereo(samples: &[f32], channels: usize) -> (Vec<f32>, Vec<f32>) {
    let frames = samples.len() / channels;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in samples.chunks(channels) {
        if frame.len() >= 2 {
            left.push(frame[0]);
            right.push(frame[1]);
        }
    }
    (left, right)
}

fn resample_if_needed(samples: &[f32], from_rate: u32) -> Vec<f32> {
    if from_rate == TARGET_SAMPLE_RATE {
        samples.to_vec()
    } else {
        resample(samples, from_rate, TARGET_SAMPLE_RATE)
    }
}

/// FFT-based resampling via rubato, with a linear-interpolation fallback if
/// the resampler cannot be constructed (e.g. degenerate rate pairs).
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    const CHUNK_SIZE: usize = 1024;

    let mut resampler =
        match FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 1) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rubato initialization failed ({}), using fallback", e);
                return resample_linear(samples, from_rate, to_rate);
            }
        };

    let input_chunk = resampler.input_frames_next();
    let output_chunk = resampler.output_frames_next();
    let ratio = to_rate as f64 / from_rate as f64;
    let mut output = Vec::with_capacity((samples.len() as f64 * ratio).ceil() as usize);

    let mut pos = 0;
    while pos < samples.len() {
        let end = (pos + input_chunk).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();
        let valid_input = chunk.len();
        if chunk.len() < input_chunk {
            chunk.resize(input_chunk, 0.0);
        }

        match resampler.process(&[chunk], None) {
            Ok(resampled) => {
                if let Some(channel) = resampled.first() {
                    // Trim padding-derived samples off the final chunk
                    let valid_output = if valid_input < input_chunk {
                        ((valid_input as f64 * ratio).ceil() as usize).min(output_chunk)
                    } else {
                        output_chunk
                    };
                    output.extend_from_slice(&channel[..valid_output.min(channel.len())]);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), falling back for the rest", e);
                output.extend(resample_linear(&samples[pos..], from_rate, to_rate));
                break;
            }
        }
        pos = end;
    }

    output
}

/// Linear-interpolation resampler. Lower quality than rubato but never fails.
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src = i as f64 * ratio;
        let idx = src as usize;
        let frac = (src - idx as f64) as f32;
        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}
