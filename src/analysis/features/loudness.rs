//! Integrated loudness (BS.1770-style, mono)
//!
//! Runs on the *unprocessed* waveform: peak normalization would destroy
//! exactly the absolute level this measurement exists to capture.
//! K-weighting prefilter (high shelf + high pass) with coefficients
//! designed for the actual sample rate, 400 ms gating blocks with 75%
//! overlap, absolute -70 LUFS and relative -10 LU gates.

use crate::error::{Result, SampletagError};
use crate::types::Waveform;

const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_LU: f64 = -10.0;
const BLOCK_SECS: f64 = 0.400;
const BLOCK_STEP_SECS: f64 = 0.100;
const SHORT_TERM_SECS: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct LoudnessFeatures {
    /// Gated integrated loudness in LUFS
    pub integrated_lufs: f64,
    /// Short-term loudness spread (95th minus 10th percentile), in LU.
    /// `None` when the signal is too short for short-term blocks.
    pub loudness_range: Option<f64>,
}

pub fn extract(raw: &Waveform) -> Result<LoudnessFeatures> {
    let sr = raw.sample_rate as f64;
    let block = (BLOCK_SECS * sr) as usize;
    if raw.len() < block {
        return Err(SampletagError::feature_error(
            "loudness",
            "signal shorter than one 400ms gating block",
        ));
    }

    let weighted = k_weight(&raw.samples, sr);

    let step = (BLOCK_STEP_SECS * sr) as usize;
    let block_loudness: Vec<f64> = mean_square_blocks(&weighted, block, step)
        .into_iter()
        .map(loudness_of_mean_square)
        .collect();

    // Absolute gate, then relative gate
    let above_absolute: Vec<(f64, f64)> = mean_square_blocks(&weighted, block, step)
        .into_iter()
        .zip(block_loudness.iter().copied())
        .filter(|&(_, l)| l > ABSOLUTE_GATE_LUFS)
        .collect();
    if above_absolute.is_empty() {
        // Silence: report the floor rather than erroring
        return Ok(LoudnessFeatures {
            integrated_lufs: ABSOLUTE_GATE_LUFS,
            loudness_range: None,
        });
    }

    let ungated_mean =
        above_absolute.iter().map(|&(ms, _)| ms).sum::<f64>() / above_absolute.len() as f64;
    let relative_gate = loudness_of_mean_square(ungated_mean) + RELATIVE_GATE_LU;

    let gated: Vec<f64> = above_absolute
        .iter()
        .filter(|&&(_, l)| l > relative_gate)
        .map(|&(ms, _)| ms)
        .collect();
    let integrated_lufs = if gated.is_empty() {
        loudness_of_mean_square(ungated_mean)
    } else {
        loudness_of_mean_square(gated.iter().sum::<f64>() / gated.len() as f64)
    };

    Ok(LoudnessFeatures {
        integrated_lufs,
        loudness_range: loudness_range(&weighted, sr),
    })
}

/// Spread of short-term (3 s) loudness above the absolute gate
fn loudness_range(weighted: &[f32], sr: f64) -> Option<f64> {
    let block = (SHORT_TERM_SECS * sr) as usize;
    let step = (sr as usize).max(1); // 1 s step
    if weighted.len() < block {
        return None;
    }

    let mut short_term: Vec<f64> = mean_square_blocks(weighted, block, step)
        .into_iter()
        .map(loudness_of_mean_square)
        .filter(|&l| l > ABSOLUTE_GATE_LUFS)
        .collect();
    if short_term.len() < 2 {
        return None;
    }

    short_term.sort_by(|a, b| a.total_cmp(b));
    let p10 = percentile(&short_term, 0.10);
    let p95 = percentile(&short_term, 0.95);
    Some((p95 - p10).max(0.0))
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx]
}

fn mean_square_blocks(samples: &[f32], block: usize, step: usize) -> Vec<f64> {
    samples
        .windows(block)
        .step_by(step.max(1))
        .map(|w| w.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / block as f64)
        .collect()
}

fn loudness_of_mean_square(ms: f64) -> f64 {
    -0.691 + 10.0 * (ms + 1e-12).log10()
}

// =============================================================================
// K-weighting prefilter
// =============================================================================

/// Biquad coefficients (a0 normalized to 1)
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// BS.1770 stage 1: +4 dB high shelf modeling head acoustics
    fn high_shelf(sr: f64) -> Self {
        let f0 = 1681.974450955533;
        let gain_db = 3.999843853973347;
        let q = 0.7071752369554196;

        let k = (std::f64::consts::PI * f0 / sr).tan();
        let vh = 10.0f64.powf(gain_db / 20.0);
        let vb = vh.powf(0.4996667741545416);
        let denom = 1.0 + k / q + k * k;

        Biquad {
            b0: (vh + vb * k / q + k * k) / denom,
            b1: 2.0 * (k * k - vh) / denom,
            b2: (vh - vb * k / q + k * k) / denom,
            a1: 2.0 * (k * k - 1.0) / denom,
            a2: (1.0 - k / q + k * k) / denom,
        }
    }

    /// BS.1770 stage 2: high pass removing inaudible rumble
    fn high_pass(sr: f64) -> Self {
        let f0 = 38.13547087602444;
        let q = 0.5003270373238773;

        let k = (std::f64::consts::PI * f0 / sr).tan();
        let denom = 1.0 + k / q + k * k;

        Biquad {
            b0: 1.0,
            b1: -2.0,
            b2: 1.0,
            a1: 2.0 * (k * k - 1.0) / denom,
            a2: (1.0 - k / q + k * k) / denom,
        }
    }

    fn process(&self, samples: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(samples.len());
        let (mut x1, mut x2, mut y1, mut y2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for &s in samples {
            let x = s as f64;
            let y = self.b0 * x + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
            out.push(y as f32);
        }
        out
    }
}

fn k_weight(samples: &[f32], sr: f64) -> Vec<f32> {
    let shelved = Biquad::high_shelf(sr).process(samples);
    Biquad::high_pass(sr).process(&shelved)
}
