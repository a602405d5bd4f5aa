//! Timbral analysis: harmonic/percussive separation and tone-color scalars
//!
//! HPSS uses the median-filtering formulation: harmonic content is smooth
//! across time, percussive content is smooth across frequency. The
//! percussive per-frame energy curve is returned so transient analysis can
//! reuse it instead of recomputing the separation.

use crate::analysis::stft::Spectrogram;
use crate::error::{Result, SampletagError};

/// Median filter length (frames for harmonic, bins for percussive)
const MEDIAN_LENGTH: usize = 17;

/// Brightness band edge
const BRIGHTNESS_HZ: f64 = 3000.0;

/// Warmth band
const WARMTH_LO_HZ: f64 = 100.0;
const WARMTH_HI_HZ: f64 = 400.0;

#[derive(Debug, Clone)]
pub struct TimbralFeatures {
    /// Fraction of spectral energy above 3 kHz
    pub brightness: f64,
    /// Fraction of spectral energy in the 100-400 Hz band
    pub warmth: f64,
    /// 1 - spectral flatness: tonal signals score low, noisy ones high
    pub roughness: f64,
    /// Harmonic share of total separated energy
    pub harmonic_ratio: f64,
    /// Percussive share of total separated energy
    pub percussive_ratio: f64,
    /// Per-frame percussive energy, for reuse by transient analysis
    pub percussive_envelope: Vec<f32>,
}

/// Run HPSS and compute timbral scalars from the shared spectrogram
pub fn extract(spectrogram: &Spectrogram) -> Result<TimbralFeatures> {
    let n_frames = spectrogram.num_frames();
    let n_bins = spectrogram.num_bins();
    if n_frames == 0 || n_bins == 0 {
        return Err(SampletagError::feature_error("timbral", "empty spectrogram"));
    }

    // Harmonic enhancement: median across time per bin
    let mut harmonic = vec![vec![0.0f32; n_bins]; n_frames];
    let mut time_slice = Vec::with_capacity(n_frames);
    for bin in 0..n_bins {
        time_slice.clear();
        time_slice.extend(spectrogram.frames.iter().map(|f| f[bin]));
        for (t, row) in harmonic.iter_mut().enumerate() {
            row[bin] = windowed_median(&time_slice, t, MEDIAN_LENGTH);
        }
    }

    // Percussive enhancement: median across frequency per frame
    let mut percussive = vec![vec![0.0f32; n_bins]; n_frames];
    for (t, frame) in spectrogram.frames.iter().enumerate() {
        for bin in 0..n_bins {
            percussive[t][bin] = windowed_median(frame, bin, MEDIAN_LENGTH);
        }
    }

    // Hard mask by enhanced-magnitude comparison, then energy totals
    let mut harmonic_energy = 0.0f64;
    let mut percussive_energy = 0.0f64;
    let mut percussive_envelope = Vec::with_capacity(n_frames);
    for t in 0..n_frames {
        let mut frame_percussive = 0.0f64;
        for bin in 0..n_bins {
            let energy = (spectrogram.frames[t][bin] as f64).powi(2);
            if harmonic[t][bin] >= percussive[t][bin] {
                harmonic_energy += energy;
            } else {
                percussive_energy += energy;
                frame_percussive += energy;
            }
        }
        percussive_envelope.push(frame_percussive.sqrt() as f32);
    }

    let total = harmonic_energy + percussive_energy;
    let (harmonic_ratio, percussive_ratio) = if total > f64::EPSILON {
        (harmonic_energy / total, percussive_energy / total)
    } else {
        (0.0, 0.0)
    };

    let (brightness, warmth) = band_fractions(spectrogram);

    Ok(TimbralFeatures {
        brightness,
        warmth,
        roughness: roughness(spectrogram),
        harmonic_ratio,
        percussive_ratio,
        percussive_envelope,
    })
}

/// Transient punch from a percussive energy envelope: mean positive
/// frame-to-frame rise relative to the envelope peak. Spiky attacks score
/// high, washes score low.
pub fn transient_punch(percussive_envelope: &[f32]) -> Result<f64> {
    if percussive_envelope.len() < 2 {
        return Err(SampletagError::feature_error(
            "transient",
            "percussive envelope too short",
        ));
    }
    let peak = percussive_envelope.iter().fold(0.0f32, |m, &v| m.max(v));
    if peak <= 0.0 {
        return Ok(0.0);
    }
    let rise_sum: f64 = percussive_envelope
        .windows(2)
        .map(|w| ((w[1] - w[0]).max(0.0) / peak) as f64)
        .sum();
    Ok((rise_sum / (percussive_envelope.len() - 1) as f64).clamp(0.0, 1.0))
}

/// Median of a window of `length` centered at `center`, clamped to bounds
fn windowed_median(values: &[f32], center: usize, length: usize) -> f32 {
    let half = length / 2;
    let start = center.saturating_sub(half);
    let end = (center + half + 1).min(values.len());
    let mut window: Vec<f32> = values[start..end].to_vec();
    window.sort_by(|a, b| a.total_cmp(b));
    window[window.len() / 2]
}

/// (brightness, warmth) energy fractions
fn band_fractions(spectrogram: &Spectrogram) -> (f64, f64) {
    let mut total = 0.0f64;
    let mut high = 0.0f64;
    let mut warm = 0.0f64;

    for frame in &spectrogram.frames {
        for (bin, &m) in frame.iter().enumerate() {
            let energy = (m as f64).powi(2);
            let hz = spectrogram.bin_frequency(bin);
            total += energy;
            if hz >= BRIGHTNESS_HZ {
                high += energy;
            }
            if (WARMTH_LO_HZ..WARMTH_HI_HZ).contains(&hz) {
                warm += energy;
            }
        }
    }

    if total > f64::EPSILON {
        (high / total, warm / total)
    } else {
        (0.0, 0.0)
    }
}

/// 1 - mean spectral flatness (geometric over arithmetic mean)
fn roughness(spectrogram: &Spectrogram) -> f64 {
    let mut flatness_sum = 0.0f64;
    let mut counted = 0usize;

    for frame in &spectrogram.frames {
        let arith = frame.iter().map(|&m| m as f64).sum::<f64>() / frame.len() as f64;
        if arith <= f64::EPSILON {
            continue;
        }
        let log_sum: f64 = frame.iter().map(|&m| (m as f64 + 1e-10).ln()).sum();
        let geom = (log_sum / frame.len() as f64).exp();
        flatness_sum += geom / arith;
        counted += 1;
    }

    if counted == 0 {
        0.0
    } else {
        // Noise is flat (ratio near 1); tonal material is peaky (near 0).
        // Report the noisy side as roughness.
        (flatness_sum / counted as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stft::magnitude_spectrogram;

    fn sine(freq: f32, secs: f32, sr: u32) -> Vec<f32> {
        (0..(secs * sr as f32) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    fn clicks(secs: f32, interval: f32, sr: u32) -> Vec<f32> {
        let period = (interval * sr as f32) as usize;
        (0..(secs * sr as f32) as usize)
            .map(|i| if i % period < 30 { 0.9 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_sustained_tone_is_mostly_harmonic() {
        let spec = magnitude_spectrogram(&sine(440.0, 1.0, 44_100), 44_100);
        let t = extract(&spec).unwrap();
        assert!(
            t.harmonic_ratio > t.percussive_ratio,
            "harmonic {} vs percussive {}",
            t.harmonic_ratio,
            t.percussive_ratio
        );
    }

    #[test]
    fn test_click_train_is_mostly_percussive() {
        let spec = magnitude_spectrogram(&clicks(1.0, 0.25, 44_100), 44_100);
        let t = extract(&spec).unwrap();
        assert!(
            t.percussive_ratio > t.harmonic_ratio,
            "harmonic {} vs percussive {}",
            t.harmonic_ratio,
            t.percussive_ratio
        );
    }

    #[test]
    fn test_brightness_ordering() {
        let dark = extract(&magnitude_spectrogram(&sine(200.0, 0.5, 44_100), 44_100)).unwrap();
        let bright = extract(&magnitude_spectrogram(&sine(8000.0, 0.5, 44_100), 44_100)).unwrap();
        assert!(bright.brightness > dark.brightness);
        assert!(dark.warmth > bright.warmth);
    }

    #[test]
    fn test_transient_punch_prefers_spiky_envelopes() {
        let spiky: Vec<f32> = (0..100).map(|i| if i % 20 == 0 { 1.0 } else { 0.0 }).collect();
        let smooth = vec![0.5f32; 100];
        assert!(transient_punch(&spiky).unwrap() > transient_punch(&smooth).unwrap());
    }

    #[test]
    fn test_transient_punch_degenerate() {
        assert!(transient_punch(&[0.5]).is_err());
        assert_eq!(transient_punch(&[0.0; 10]).unwrap(), 0.0);
    }
}
