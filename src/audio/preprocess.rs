//! Waveform preprocessing
//!
//! Prepares one decoded waveform for analysis: remove DC offset, trim edge
//! silence, peak-normalize. The untouched decode output is kept alongside
//! because integrated loudness needs absolute level.

use crate::audio::decoder::DecodedAudio;
use crate::error::{Result, SampletagError};
use crate::types::{PreparedAudio, Waveform};
use std::path::Path;
use tracing::debug;

/// Edge-trim threshold relative to the waveform's peak amplitude
const TRIM_THRESHOLD_RATIO: f32 = 0.005;

/// Normalization target peak
const NORMALIZE_PEAK: f32 = 0.98;

/// Preprocess decoded audio into the pipeline's working form
pub fn prepare(decoded: DecodedAudio, path: &Path) -> Result<PreparedAudio> {
    let raw = decoded.mono;
    if raw.is_empty() {
        return Err(SampletagError::EmptyAudio(path.to_path_buf()));
    }

    let mut samples = remove_dc_offset(&raw.samples);
    let (start, end) = trim_bounds(&samples);
    samples = samples[start..end].to_vec();
    normalize_peak(&mut samples);

    debug!(
        "Preprocessed: {} -> {} samples (trimmed {} leading, {} trailing)",
        raw.len(),
        samples.len(),
        start,
        raw.len() - end
    );

    Ok(PreparedAudio {
        processed: Waveform::new(samples, raw.sample_rate),
        raw,
        stereo: decoded.stereo,
    })
}

/// Subtract the mean so downstream energy measures aren't biased by DC
fn remove_dc_offset(samples: &[f32]) -> Vec<f32> {
    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    samples.iter().map(|s| s - mean).collect()
}

/// Find the [start, end) span of non-silent content.
/// Returns the full span if the signal is entirely below threshold, so a
/// silent file survives as-is instead of collapsing to zero samples.
fn trim_bounds(samples: &[f32]) -> (usize, usize) {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak <= 0.0 {
        return (0, samples.len());
    }
    let threshold = peak * TRIM_THRESHOLD_RATIO;

    let start = samples.iter().position(|s| s.abs() > threshold);
    let end = samples.iter().rposition(|s| s.abs() > threshold);

    match (start, end) {
        (Some(s), Some(e)) if e >= s => (s, e + 1),
        _ => (0, samples.len()),
    }
}

/// Scale so the absolute peak hits [`NORMALIZE_PEAK`]
fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        let gain = NORMALIZE_PEAK / peak;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}
