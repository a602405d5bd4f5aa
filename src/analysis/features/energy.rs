//! Energy and dynamics features

use crate::error::{Result, SampletagError};
use crate::types::{Waveform, HOP_SIZE};

/// dB floor matching the usual 80 dB display range
const DB_FLOOR: f64 = -80.0;

#[derive(Debug, Clone)]
pub struct EnergyFeatures {
    /// Mean of the RMS envelope
    pub rms_energy: f64,
    /// Mean envelope level in dB relative to the envelope peak
    pub loudness_db: f64,
    /// Spread of the dB envelope (max - min)
    pub dynamic_range: f64,
    /// Mean onset strength (punchiness indicator)
    pub onset_strength: f64,
}

/// Extract energy features. `onset_envelope` is the request's shared
/// onset-strength envelope.
pub fn extract(waveform: &Waveform, onset_envelope: &[f32]) -> Result<EnergyFeatures> {
    let rms = rms_envelope(&waveform.samples);
    if rms.is_empty() {
        return Err(SampletagError::feature_error("energy", "empty RMS envelope"));
    }

    let rms_mean = rms.iter().map(|&v| v as f64).sum::<f64>() / rms.len() as f64;

    let peak = rms.iter().fold(0.0f32, |m, &v| m.max(v));
    let db: Vec<f64> = rms
        .iter()
        .map(|&v| {
            if peak > 0.0 && v > 0.0 {
                (20.0 * (v as f64 / peak as f64).log10()).max(DB_FLOOR)
            } else {
                DB_FLOOR
            }
        })
        .collect();

    let loudness_db = db.iter().sum::<f64>() / db.len() as f64;
    let db_max = db.iter().cloned().fold(f64::MIN, f64::max);
    let db_min = db.iter().cloned().fold(f64::MAX, f64::min);

    let onset_strength = if onset_envelope.is_empty() {
        0.0
    } else {
        onset_envelope.iter().map(|&v| v as f64).sum::<f64>() / onset_envelope.len() as f64
    };

    Ok(EnergyFeatures {
        rms_energy: rms_mean,
        loudness_db,
        dynamic_range: db_max - db_min,
        onset_strength,
    })
}

/// Per-frame RMS envelope over the standard hop, frame length 2 hops.
/// Signals shorter than one frame collapse to a single value.
pub fn rms_envelope(samples: &[f32]) -> Vec<f32> {
    let frame = HOP_SIZE * 2;
    if samples.len() < frame {
        if samples.is_empty() {
            return Vec::new();
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        return vec![(sum_sq / samples.len() as f32).sqrt()];
    }
    samples
        .windows(frame)
        .step_by(HOP_SIZE)
        .map(|w| (w.iter().map(|s| s * s).sum::<f32>() / frame as f32).sqrt())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_envelope_of_constant_signal() {
        let env = rms_envelope(&vec![0.5f32; HOP_SIZE * 8]);
        assert!(!env.is_empty());
        for v in &env {
            assert!((v - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rms_envelope_of_short_signal() {
        let env = rms_envelope(&[0.5f32; 64]);
        assert_eq!(env.len(), 1);
        assert!((env[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_constant_signal_has_no_dynamic_range() {
        let w = Waveform::new(vec![0.5f32; HOP_SIZE * 16], 44_100);
        let f = extract(&w, &[]).unwrap();
        assert!(f.dynamic_range < 0.5);
        assert!((f.loudness_db - 0.0).abs() < 0.5);
        assert!((f.rms_energy - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decaying_signal_has_dynamic_range() {
        let n = HOP_SIZE * 32;
        let samples: Vec<f32> = (0..n)
            .map(|i| 0.9 * (-6.0 * i as f32 / n as f32).exp())
            .collect();
        let w = Waveform::new(samples, 44_100);
        let f = extract(&w, &[]).unwrap();
        assert!(f.dynamic_range > 20.0);
        assert!(f.loudness_db < -5.0);
    }
}
