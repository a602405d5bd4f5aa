//! Stereo-field analysis
//!
//! Only meaningful for two-channel sources; the pipeline passes `None`
//! through as a null field for mono files.

use crate::error::{Result, SampletagError};
use crate::types::StereoPair;

/// Stereo width in [0, 1]: 0 for identical channels (mono-compatible),
/// approaching 1 as the channels decorrelate or invert.
pub fn stereo_width(stereo: &StereoPair) -> Result<f64> {
    let n = stereo.left.len().min(stereo.right.len());
    if n < 2 {
        return Err(SampletagError::feature_error(
            "stereo",
            "stereo pair too short",
        ));
    }

    let left = &stereo.left[..n];
    let right = &stereo.right[..n];

    let mean_l = left.iter().sum::<f32>() / n as f32;
    let mean_r = right.iter().sum::<f32>() / n as f32;

    let mut cov = 0.0f64;
    let mut var_l = 0.0f64;
    let mut var_r = 0.0f64;
    for i in 0..n {
        let dl = (left[i] - mean_l) as f64;
        let dr = (right[i] - mean_r) as f64;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }

    let denom = (var_l * var_r).sqrt();
    if denom <= f64::EPSILON {
        // Both channels flat: no stereo information, zero width
        return Ok(0.0);
    }

    let correlation = (cov / denom).clamp(-1.0, 1.0);
    Ok(((1.0 - correlation) / 2.0).clamp(0.0, 1.0))
}
