//! Coarse audio fingerprint
//!
//! Hashes the sequence of per-frame spectral peak bins (quantized to ride
//! out tiny numeric differences) into a short hex token usable for
//! duplicate detection across a sample library. Not a robust acoustic
//! fingerprint; identical files always match, remasters may not.

use crate::analysis::stft::Spectrogram;
use crate::error::{Result, SampletagError};
use hash32::FnvHasher;
use std::hash::Hasher;

/// Peak bins are quantized to this granularity before hashing
const BIN_QUANTUM: usize = 4;

pub fn fingerprint(spectrogram: &Spectrogram) -> Result<String> {
    if spectrogram.num_frames() == 0 {
        return Err(SampletagError::feature_error(
            "fingerprint",
            "empty spectrogram",
        ));
    }

    use hash32::Hasher as Hash32Hasher;

    let mut hasher = FnvHasher::default();
    for frame in &spectrogram.frames {
        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bin, _)| bin)
            .unwrap_or(0);
        let quantized = (peak_bin / BIN_QUANTUM) as u32;
        hasher.write(&quantized.to_le_bytes());
    }
    hasher.write(&(spectrogram.num_frames() as u32).to_le_bytes());

    Ok(format!("{:08x}", hasher.finish32()))
}
