//! Genre and mood scoring
//!
//! Coarse genre buckets scored from the core-tier scalars plus tempo, and
//! a single mood descriptor. Both are deliberately broad: library search
//! facets, not musicological claims.

use crate::analysis::features::instruments::ScalarInputs;
use crate::types::InstrumentPrediction;

const MAX_GENRES: usize = 3;

#[derive(Debug)]
pub struct GenreModel {
    labels: Vec<&'static str>,
}

impl GenreModel {
    pub fn load() -> Self {
        Self {
            labels: vec!["electronic", "percussive", "acoustic", "ambient", "bass-music"],
        }
    }

    pub fn labels(&self) -> &[&'static str] {
        &self.labels
    }

    /// Score genre buckets. `bpm` is the rhythm stage's tempo, threaded in
    /// rather than recomputed.
    pub fn predict(&self, inputs: &ScalarInputs, bpm: Option<f64>) -> Vec<InstrumentPrediction> {
        let mut scores: Vec<InstrumentPrediction> = Vec::new();
        let mut push = |name: &str, confidence: f64| {
            scores.push(InstrumentPrediction {
                name: name.to_string(),
                confidence,
            });
        };

        let dance_tempo = bpm.is_some_and(|b| (110.0..=150.0).contains(&b));
        if inputs.centroid > 2500.0 && (dance_tempo || inputs.onset_strength > 0.3) {
            push("electronic", if dance_tempo { 0.7 } else { 0.55 });
        }
        if inputs.onset_strength > 0.4 {
            push("percussive", 0.6);
        }
        if inputs.zero_crossing_rate < 0.06 && inputs.centroid < 2500.0 {
            push("acoustic", 0.5);
        }
        if inputs.loudness_db < -30.0 && inputs.onset_strength < 0.1 {
            push("ambient", 0.6);
        }
        if inputs.rolloff < 2000.0 {
            push("bass-music", 0.5);
        }

        scores.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        scores.truncate(MAX_GENRES);
        scores
    }

    /// Single mood descriptor from level and brightness
    pub fn mood(&self, loudness_db: f64, brightness: Option<f64>) -> String {
        if loudness_db > -10.0 {
            "aggressive".to_string()
        } else if loudness_db < -30.0 {
            "calm".to_string()
        } else if brightness.is_some_and(|b| b > 0.4) {
            "energetic".to_string()
        } else {
            "warm".to_string()
        }
    }
}
