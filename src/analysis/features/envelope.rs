//! ADSR envelope estimation from the RMS curve

use crate::analysis::features::energy::rms_envelope;
use crate::error::{Result, SampletagError};
use crate::types::{Waveform, HOP_SIZE};

/// Level treated as "released" relative to the sustain level
const RELEASE_RATIO: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct AdsrFeatures {
    /// Seconds from start to the envelope peak
    pub attack_time: f64,
    /// Seconds from the peak down to the sustain level
    pub decay_time: f64,
    /// Sustain level relative to the peak, in [0, 1]
    pub sustain_level: f64,
    /// Seconds from the end of the sustained region to the end
    pub release_time: f64,
}

pub fn extract(waveform: &Waveform) -> Result<AdsrFeatures> {
    let rms = rms_envelope(&waveform.samples);
    if rms.len() < 4 {
        return Err(SampletagError::feature_error(
            "envelope",
            "signal too short for ADSR estimation",
        ));
    }

    let frame_secs = HOP_SIZE as f64 / waveform.sample_rate as f64;
    let n = rms.len();

    let (peak_idx, &peak) = rms
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .ok_or_else(|| SampletagError::feature_error("envelope", "empty RMS envelope"))?;
    if peak <= 0.0 {
        return Err(SampletagError::feature_error("envelope", "silent signal"));
    }

    // Sustain level: median of the middle half of the post-peak region
    let post_peak = &rms[peak_idx..];
    let sustain = if post_peak.len() >= 4 {
        let mid_start = post_peak.len() / 4;
        let mid_end = post_peak.len() * 3 / 4;
        let mut mid: Vec<f32> = post_peak[mid_start..mid_end.max(mid_start + 1)].to_vec();
        mid.sort_by(|a, b| a.total_cmp(b));
        mid[mid.len() / 2]
    } else {
        *post_peak.last().unwrap_or(&0.0)
    };
    let sustain_level = (sustain / peak).clamp(0.0, 1.0) as f64;

    // Decay: peak down to the first frame at or below the sustain level
    let decay_frames = post_peak
        .iter()
        .position(|&v| v <= sustain)
        .unwrap_or(post_peak.len() - 1);

    // Release: last frame still above RELEASE_RATIO of sustain to the end
    let release_floor = (sustain * RELEASE_RATIO).max(peak * 0.01);
    let release_start = rms
        .iter()
        .rposition(|&v| v > release_floor)
        .unwrap_or(n - 1);
    let release_frames = n - 1 - release_start;

    Ok(AdsrFeatures {
        attack_time: peak_idx as f64 * frame_secs,
        decay_time: decay_frames as f64 * frame_secs,
        sustain_level,
        release_time: release_frames as f64 * frame_secs,
    })
}
