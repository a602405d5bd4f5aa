//! Rhythm features: tempo, beat count, danceability
//!
//! Tempo comes from the autocorrelation of the onset-strength envelope,
//! searched over the musically plausible 60-180 BPM lag range.

use crate::error::{Result, SampletagError};
use crate::types::HOP_SIZE;

pub const MIN_BPM: f64 = 60.0;
pub const MAX_BPM: f64 = 180.0;

#[derive(Debug, Clone)]
pub struct RhythmFeatures {
    pub bpm: f64,
    pub beats_count: u32,
    /// Strength of the winning autocorrelation peak, in [0, 1]
    pub periodicity: f64,
}

/// Estimate tempo from the onset envelope. Errors when the envelope is too
/// short or carries no periodic energy.
pub fn extract(
    onset_envelope: &[f32],
    sample_rate: u32,
    duration: f64,
) -> Result<RhythmFeatures> {
    let frame_rate = sample_rate as f64 / HOP_SIZE as f64;

    // Lag bounds for the BPM search range; min_lag rounds up so no lag in
    // range can map above MAX_BPM
    let min_lag = (frame_rate * 60.0 / MAX_BPM).ceil() as usize;
    let max_lag = (frame_rate * 60.0 / MIN_BPM).ceil() as usize;

    if onset_envelope.len() < max_lag * 2 {
        return Err(SampletagError::feature_error(
            "rhythm",
            "envelope too short for tempo estimation",
        ));
    }

    let n = onset_envelope.len();
    let peak = onset_envelope
        .iter()
        .fold(0.0f32, |m, &v| m.max(v.abs())) as f64;
    let mean = onset_envelope.iter().sum::<f32>() / n as f32;
    let centered: Vec<f64> = onset_envelope.iter().map(|&v| (v - mean) as f64).collect();
    let zero_lag: f64 = centered.iter().map(|v| v * v).sum();
    // Threshold scales with the envelope so f32 rounding residue in a
    // constant envelope never passes as real variance
    if zero_lag <= n as f64 * peak * peak * 1e-9 {
        return Err(SampletagError::feature_error(
            "rhythm",
            "flat onset envelope",
        ));
    }

    let mut best_lag = 0usize;
    let mut best_value = 0.0f64;
    for lag in min_lag.max(1)..=max_lag.min(n - 1) {
        let ac: f64 = centered[..n - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum();
        let normalized = ac / zero_lag;
        if normalized > best_value {
            best_value = normalized;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_value <= 0.0 {
        return Err(SampletagError::feature_error(
            "rhythm",
            "no periodicity in BPM range",
        ));
    }

    let bpm = frame_rate * 60.0 / best_lag as f64;
    let beats_count = (duration * bpm / 60.0).round().max(0.0) as u32;

    Ok(RhythmFeatures {
        bpm,
        beats_count,
        periodicity: best_value.clamp(0.0, 1.0),
    })
}

/// Danceability in [0, 1]: how steady and dance-tempo-like the rhythm is.
/// Periodicity dominates; tempo proximity to the 90-150 BPM comfort band
/// scales it.
pub fn danceability(rhythm: &RhythmFeatures) -> f64 {
    let tempo_factor = if (90.0..=150.0).contains(&rhythm.bpm) {
        1.0
    } else {
        let distance = if rhythm.bpm < 90.0 {
            90.0 - rhythm.bpm
        } else {
            rhythm.bpm - 150.0
        };
        (1.0 - distance / 60.0).max(0.3)
    };
    (rhythm.periodicity * tempo_factor).clamp(0.0, 1.0)
}
