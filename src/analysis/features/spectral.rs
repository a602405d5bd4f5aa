//! Spectral features: brightness, shape, texture, and timbral cepstrum

use crate::analysis::stft::Spectrogram;
use crate::error::{Result, SampletagError};
use crate::types::Waveform;

/// Rolloff energy percentile
const ROLLOFF_PERCENT: f32 = 0.85;

/// Number of MFCC coefficients reported
const N_MFCC: usize = 13;

/// Mel filterbank size
const N_MEL_FILTERS: usize = 26;

/// Octave-spaced sub-bands for spectral contrast, starting here
const CONTRAST_BASE_HZ: f64 = 200.0;
const CONTRAST_BANDS: usize = 6;

#[derive(Debug, Clone)]
pub struct SpectralFeatures {
    pub centroid: f64,
    pub rolloff: f64,
    pub bandwidth: f64,
    pub contrast: f64,
    pub zero_crossing_rate: f64,
    pub mfcc_mean: Vec<f64>,
}

/// Extract spectral features from the shared magnitude spectrogram
pub fn extract(waveform: &Waveform, spectrogram: &Spectrogram) -> Result<SpectralFeatures> {
    if spectrogram.num_frames() == 0 || spectrogram.num_bins() == 0 {
        return Err(SampletagError::feature_error(
            "spectral",
            "empty spectrogram",
        ));
    }

    let mut centroids = Vec::with_capacity(spectrogram.num_frames());
    let mut rolloffs = Vec::with_capacity(spectrogram.num_frames());
    let mut bandwidths = Vec::with_capacity(spectrogram.num_frames());

    for frame in &spectrogram.frames {
        let total: f64 = frame.iter().map(|&m| m as f64).sum();
        if total <= f64::EPSILON {
            centroids.push(0.0);
            rolloffs.push(0.0);
            bandwidths.push(0.0);
            continue;
        }

        let centroid: f64 = frame
            .iter()
            .enumerate()
            .map(|(bin, &m)| spectrogram.bin_frequency(bin) * m as f64)
            .sum::<f64>()
            / total;
        centroids.push(centroid);

        // Rolloff: frequency below which ROLLOFF_PERCENT of the energy sits
        let target = total * ROLLOFF_PERCENT as f64;
        let mut cumulative = 0.0;
        let mut rolloff_bin = frame.len() - 1;
        for (bin, &m) in frame.iter().enumerate() {
            cumulative += m as f64;
            if cumulative >= target {
                rolloff_bin = bin;
                break;
            }
        }
        rolloffs.push(spectrogram.bin_frequency(rolloff_bin));

        let variance: f64 = frame
            .iter()
            .enumerate()
            .map(|(bin, &m)| {
                let d = spectrogram.bin_frequency(bin) - centroid;
                d * d * m as f64
            })
            .sum::<f64>()
            / total;
        bandwidths.push(variance.sqrt());
    }

    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;

    Ok(SpectralFeatures {
        centroid: mean(&centroids),
        rolloff: mean(&rolloffs),
        bandwidth: mean(&bandwidths),
        contrast: spectral_contrast(spectrogram),
        zero_crossing_rate: zero_crossing_rate(&waveform.samples),
        mfcc_mean: mfcc_mean(spectrogram),
    })
}

/// Fraction of adjacent sample pairs that change sign
pub fn zero_crossing_rate(samples: &[f32]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / (samples.len() - 1) as f64
}

/// Mean peak-to-valley difference in log magnitude across octave bands
fn spectral_contrast(spectrogram: &Spectrogram) -> f64 {
    let mut band_contrasts: Vec<f64> = Vec::new();

    for band in 0..CONTRAST_BANDS {
        let lo_hz = CONTRAST_BASE_HZ * f64::powi(2.0, band as i32);
        let hi_hz = lo_hz * 2.0;
        let lo_bin = bin_for_frequency(spectrogram, lo_hz);
        let hi_bin = bin_for_frequency(spectrogram, hi_hz).min(spectrogram.num_bins());
        if hi_bin <= lo_bin + 1 {
            continue;
        }

        let mut per_frame = Vec::with_capacity(spectrogram.num_frames());
        for frame in &spectrogram.frames {
            let band_mags = &frame[lo_bin..hi_bin];
            let peak = band_mags.iter().fold(f32::MIN, |m, &v| m.max(v));
            let valley = band_mags.iter().fold(f32::MAX, |m, &v| m.min(v));
            let peak_db = 20.0 * (peak.max(1e-10) as f64).log10();
            let valley_db = 20.0 * (valley.max(1e-10) as f64).log10();
            per_frame.push(peak_db - valley_db);
        }
        if !per_frame.is_empty() {
            band_contrasts.push(per_frame.iter().sum::<f64>() / per_frame.len() as f64);
        }
    }

    if band_contrasts.is_empty() {
        0.0
    } else {
        band_contrasts.iter().sum::<f64>() / band_contrasts.len() as f64
    }
}

fn bin_for_frequency(spectrogram: &Spectrogram, hz: f64) -> usize {
    let bin_width = spectrogram.bin_frequency(1);
    if bin_width <= 0.0 {
        return 0;
    }
    (hz / bin_width).round() as usize
}

// =============================================================================
// MFCC
// =============================================================================

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0f64.powf(mel / 2595.0) - 1.0)
}

/// Mean 13-coefficient MFCC vector over all frames: mel filterbank, log
/// energies, DCT-II
fn mfcc_mean(spectrogram: &Spectrogram) -> Vec<f64> {
    let n_bins = spectrogram.num_bins();
    let nyquist = spectrogram.sample_rate as f64 / 2.0;

    // Triangular filter center frequencies, equally spaced on the mel scale
    let mel_max = hz_to_mel(nyquist);
    let centers: Vec<usize> = (0..N_MEL_FILTERS + 2)
        .map(|i| {
            let mel = mel_max * i as f64 / (N_MEL_FILTERS + 1) as f64;
            let hz = mel_to_hz(mel);
            ((hz / nyquist) * (n_bins - 1) as f64).round() as usize
        })
        .collect();

    let mut coeff_sums = vec![0.0f64; N_MFCC];

    for frame in &spectrogram.frames {
        // Filterbank energies
        let mut energies = vec![0.0f64; N_MEL_FILTERS];
        for (f, energy) in energies.iter_mut().enumerate() {
            let (lo, mid, hi) = (centers[f], centers[f + 1], centers[f + 2]);
            for bin in lo..hi.min(n_bins) {
                let weight = if bin <= mid {
                    if mid > lo {
                        (bin - lo) as f64 / (mid - lo) as f64
                    } else {
                        1.0
                    }
                } else if hi > mid {
                    (hi - bin) as f64 / (hi - mid) as f64
                } else {
                    1.0
                };
                *energy += weight * (frame[bin] as f64).powi(2);
            }
        }

        let log_energies: Vec<f64> = energies.iter().map(|&e| (e + 1e-10).ln()).collect();

        // DCT-II
        for (k, sum) in coeff_sums.iter_mut().enumerate() {
            let coeff: f64 = log_energies
                .iter()
                .enumerate()
                .map(|(n, &e)| {
                    e * (std::f64::consts::PI * k as f64 * (n as f64 + 0.5)
                        / N_MEL_FILTERS as f64)
                        .cos()
                })
                .sum();
            *sum += coeff;
        }
    }

    let n_frames = spectrogram.num_frames().max(1) as f64;
    coeff_sums.iter().map(|&s| s / n_frames).collect()
}
