//! Short-time Fourier transform utilities
//!
//! One magnitude spectrogram is computed per request and shared by the
//! onset envelope, spectral features, timbral analysis, and fingerprint.

use crate::types::{FRAME_SIZE, HOP_SIZE};
use rustfft::{num_complex::Complex, FftPlanner};

/// Magnitude spectrogram: `frames[t][bin]`, bins 0..=FRAME_SIZE/2
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frames.first().map_or(0, |f| f.len())
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / FRAME_SIZE as f64
    }
}

/// Compute the magnitude spectrogram with a Hann window, frame size
/// [`FRAME_SIZE`] and hop [`HOP_SIZE`]. Signals shorter than one frame are
/// zero-padded to a single frame.
pub fn magnitude_spectrogram(samples: &[f32], sample_rate: u32) -> Spectrogram {
    let window = hann_window(FRAME_SIZE);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);

    let num_frames = if samples.len() < FRAME_SIZE {
        1
    } else {
        (samples.len() - FRAME_SIZE) / HOP_SIZE + 1
    };

    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); FRAME_SIZE];

    for t in 0..num_frames {
        let start = t * HOP_SIZE;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut buffer);

        let magnitudes: Vec<f32> = buffer[..FRAME_SIZE / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect();
        frames.push(magnitudes);
    }

    Spectrogram {
        frames,
        sample_rate,
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = std::f32::consts::PI * 2.0 * i as f32 / size as f32;
            0.5 * (1.0 - x.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrogram_shape() {
        let samples = vec![0.0f32; FRAME_SIZE + HOP_SIZE * 3];
        let spec = magnitude_spectrogram(&samples, 44_100);
        assert_eq!(spec.num_frames(), 4);
        assert_eq!(spec.num_bins(), FRAME_SIZE / 2 + 1);
    }

    #[test]
    fn test_short_signal_yields_one_frame() {
        let spec = magnitude_spectrogram(&[0.1f32; 100], 44_100);
        assert_eq!(spec.num_frames(), 1);
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let sr = 44_100u32;
        let freq = 441.0f32 * 4.0; // 1764 Hz
        let samples: Vec<f32> = (0..FRAME_SIZE * 2)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let spec = magnitude_spectrogram(&samples, sr);
        let frame = &spec.frames[0];
        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let expected = (freq as f64 * FRAME_SIZE as f64 / sr as f64).round() as usize;
        assert!((peak_bin as i64 - expected as i64).abs() <= 1);
    }
}
