//! Onset detection: strength envelope and peak picking
//!
//! The picker implements the classic three-condition scheme (local max,
//! prominence above a local mean, minimum spacing) in plain, deterministic
//! float code.

use crate::analysis::stft::Spectrogram;
use crate::types::{EventSet, HOP_SIZE};

/// Prominence threshold used for general onset detection
pub const DEFAULT_DELTA: f32 = 0.07;

/// Stricter prominence used when the classifier wants only confident onsets
pub const STRICT_DELTA: f32 = 0.14;

/// Compute the onset-strength envelope as positive spectral flux: per
/// frame, the mean increase in bin magnitude since the previous frame
/// (per-bin mean, so the scale is independent of the FFT size). One value
/// per hop; the first frame is 0.
pub fn onset_strength(spectrogram: &Spectrogram) -> Vec<f32> {
    let frames = &spectrogram.frames;
    if frames.is_empty() {
        return Vec::new();
    }

    let mut envelope = Vec::with_capacity(frames.len());
    envelope.push(0.0);
    for t in 1..frames.len() {
        let flux: f32 = frames[t]
            .iter()
            .zip(frames[t - 1].iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();
        envelope.push(flux / frames[t].len() as f32);
    }
    envelope
}

/// Three-condition peak picker over an onset-strength envelope.
///
/// Window sizes are time-based constants converted to frames from the
/// sample rate and hop size, so behavior is resolution-independent.
#[derive(Debug, Clone)]
pub struct PeakPicker {
    /// Local-max window, frames before the candidate (~30 ms)
    pub pre_max: usize,
    /// Local-max window, frames after the candidate (~0 ms)
    pub post_max: usize,
    /// Averaging window before the candidate (~100 ms)
    pub pre_avg: usize,
    /// Averaging window after the candidate (~100 ms)
    pub post_avg: usize,
    /// Minimum spacing between accepted peaks (~30 ms)
    pub wait: usize,
    /// Prominence threshold above the local mean
    pub delta: f32,
}

impl PeakPicker {
    /// Picker with the default time constants for the given resolution
    pub fn new(sample_rate: u32, hop_size: usize) -> Self {
        let frames_for = |seconds: f64| -> usize {
            (seconds * sample_rate as f64 / hop_size as f64).round() as usize
        };
        Self {
            pre_max: frames_for(0.03).max(1),
            post_max: frames_for(0.0),
            pre_avg: frames_for(0.10).max(1),
            post_avg: frames_for(0.10).max(1),
            wait: frames_for(0.03).max(1),
            delta: DEFAULT_DELTA,
        }
    }

    /// Picker at the standard analysis resolution
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        Self::new(sample_rate, HOP_SIZE)
    }

    pub fn with_delta(mut self, delta: f32) -> Self {
        self.delta = delta;
        self
    }

    /// Pick onset frames from the envelope.
    ///
    /// Never errors: empty, too-short, or flat envelopes yield an empty
    /// [`EventSet`].
    pub fn pick(&self, envelope: &[f32]) -> EventSet {
        let env = match normalize(envelope) {
            Some(env) => env,
            None => return EventSet::empty(),
        };

        let n = env.len();
        if n <= self.pre_max + self.post_max {
            return EventSet::empty();
        }

        let mut accepted: Vec<usize> = Vec::new();
        let mut last_accepted: Option<usize> = None;

        // Guard bands: candidates need their full local-max window in range
        for i in self.pre_max..n - self.post_max {
            let value = env[i];

            // Condition 1: local maximum over [i - pre_max, i + post_max]
            let max_window = &env[i - self.pre_max..=i + self.post_max];
            let window_max = max_window.iter().fold(f32::MIN, |m, &v| m.max(v));
            if value < window_max {
                continue;
            }

            // Condition 2: prominence over the (clamped) averaging window
            let avg_start = i.saturating_sub(self.pre_avg);
            let avg_end = (i + self.post_avg).min(n - 1);
            let avg_window = &env[avg_start..=avg_end];
            let mean = avg_window.iter().sum::<f32>() / avg_window.len() as f32;
            if value < mean + self.delta {
                continue;
            }

            // Condition 3: minimum spacing since the last accepted peak
            if let Some(last) = last_accepted {
                if i - last <= self.wait {
                    continue;
                }
            }

            accepted.push(i);
            last_accepted = Some(i);
        }

        EventSet::new(accepted)
    }

    /// Pick onsets and backtrack each to the preceding local energy
    /// minimum, anchoring the event at the attack start instead of the
    /// detected peak. `energy` is a per-frame energy curve (RMS envelope)
    /// aligned with the onset envelope.
    pub fn pick_backtracked(&self, envelope: &[f32], energy: &[f32]) -> EventSet {
        let picked = self.pick(envelope);
        if picked.is_empty() || energy.is_empty() {
            return picked;
        }

        let limit = 2 * self.pre_max;
        let mut frames: Vec<usize> = Vec::with_capacity(picked.len());
        for &f in picked.frames() {
            let anchored = backtrack_to_minimum(energy, f.min(energy.len() - 1), limit);
            // Preserve strict monotonicity; drop a frame that collapses
            // onto or before its predecessor
            if frames.last().map_or(true, |&prev| anchored > prev) {
                frames.push(anchored);
            }
        }
        EventSet::new(frames)
    }
}

/// Walk backward from `start` while the energy keeps decreasing, at most
/// `limit` frames, and return the frame of the local minimum.
fn backtrack_to_minimum(energy: &[f32], start: usize, limit: usize) -> usize {
    let floor = start.saturating_sub(limit);
    let mut i = start;
    while i > floor && energy[i - 1] <= energy[i] {
        i -= 1;
    }
    i
}

/// Min/max normalize to [0, 1]. Returns `None` for empty or flat input.
fn normalize(envelope: &[f32]) -> Option<Vec<f32>> {
    if envelope.is_empty() {
        return None;
    }
    let min = envelope.iter().fold(f32::MAX, |m, &v| m.min(v));
    let max = envelope.iter().fold(f32::MIN, |m, &v| m.max(v));
    let range = max - min;
    if !(range.is_finite()) || range <= 0.0 {
        return None;
    }
    Some(envelope.iter().map(|&v| (v - min) / range).collect())
}
