//! Heuristic instrument prediction
//!
//! Spectral/energy threshold rules per instrument class. Predictions are
//! sorted by confidence, deduplicated, and capped at the top five.

use crate::types::InstrumentPrediction;

/// Scalar inputs shared by the instrument and genre models, computed once
/// by the pipeline's core tier.
#[derive(Debug, Clone, Copy)]
pub struct ScalarInputs {
    pub centroid: f64,
    pub rolloff: f64,
    pub zero_crossing_rate: f64,
    pub rms_energy: f64,
    pub onset_strength: f64,
    pub loudness_db: f64,
    pub duration: f64,
}

const MAX_PREDICTIONS: usize = 5;

#[derive(Debug)]
pub struct InstrumentModel {
    labels: Vec<&'static str>,
}

impl InstrumentModel {
    /// Build the model's label vocabulary. Cheap today, but kept behind
    /// the ModelCache so the lifecycle matches heavier backends.
    pub fn load() -> Self {
        Self {
            labels: vec![
                "kick",
                "snare",
                "hihat",
                "bass",
                "synth",
                "vocal",
                "percussion",
            ],
        }
    }

    pub fn labels(&self) -> &[&'static str] {
        &self.labels
    }

    /// Predict likely instruments from core-tier scalars
    pub fn predict(&self, inputs: &ScalarInputs) -> Vec<InstrumentPrediction> {
        let mut predictions: Vec<InstrumentPrediction> = Vec::new();
        let mut push = |name: &str, confidence: f64| {
            predictions.push(InstrumentPrediction {
                name: name.to_string(),
                confidence,
            });
        };

        let ScalarInputs {
            centroid,
            rolloff,
            zero_crossing_rate: zcr,
            rms_energy: rms,
            onset_strength,
            duration,
            ..
        } = *inputs;

        // Kick: low centroid, high energy, strong onset, short
        if centroid < 1500.0 && onset_strength > 0.3 && rms > 0.05 && duration < 1.5 {
            push("kick", 0.75);
        }
        // Snare: mid centroid, noisy, strong onset, short
        else if (1500.0..4000.0).contains(&centroid)
            && zcr > 0.08
            && onset_strength > 0.25
            && duration < 1.0
        {
            push("snare", 0.70);
        }

        // Hi-hat/cymbals: very high centroid, metallic texture
        if centroid > 5000.0 && zcr > 0.12 {
            push("hihat", 0.65);
        }

        // Bass: very low centroid, sustained, low zcr
        if centroid < 800.0 && rolloff < 2000.0 && zcr < 0.05 {
            push("bass", 0.70);
        }

        // Synth/pad: mid-high centroid, harmonic content
        if (2000.0..6000.0).contains(&centroid) && zcr < 0.06 && duration > 1.0 {
            push("synth", 0.60);
        }

        // Vocal: high centroid, variable texture, mid energy
        if centroid > 3000.0 && (0.08..0.15).contains(&zcr) && (0.05..0.3).contains(&rms) {
            push("vocal", 0.50);
        }

        // Percussion (general): strong onsets, short material
        if onset_strength > 0.4 && duration < 2.0 {
            push("percussion", 0.55);
        }

        // Sort by confidence, keep first occurrence per name, cap at five
        predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut seen: Vec<String> = Vec::new();
        predictions.retain(|p| {
            if seen.contains(&p.name) {
                false
            } else {
                seen.push(p.name.clone());
                true
            }
        });
        predictions.truncate(MAX_PREDICTIONS);
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ScalarInputs {
        ScalarInputs {
            centroid: 2500.0,
            rolloff: 5000.0,
            zero_crossing_rate: 0.06,
            rms_energy: 0.1,
            onset_strength: 0.1,
            loudness_db: -15.0,
            duration: 2.0,
        }
    }

    #[test]
    fn test_kick_profile() {
        let model = InstrumentModel::load();
        let preds = model.predict(&ScalarInputs {
            centroid: 900.0,
            rolloff: 1500.0,
            zero_crossing_rate: 0.02,
            rms_energy: 0.2,
            onset_strength: 0.5,
            loudness_db: -8.0,
            duration: 0.4,
        });
        assert_eq!(preds[0].name, "kick");
        assert!(preds[0].confidence >= 0.75);
    }

    #[test]
    fn test_hihat_profile() {
        let model = InstrumentModel::load();
        let preds = model.predict(&ScalarInputs {
            centroid: 7000.0,
            rolloff: 12_000.0,
            zero_crossing_rate: 0.2,
            rms_energy: 0.08,
            onset_strength: 0.45,
            loudness_db: -12.0,
            duration: 0.3,
        });
        assert!(preds.iter().any(|p| p.name == "hihat"));
    }

    #[test]
    fn test_predictions_are_sorted_and_capped() {
        let model = InstrumentModel::load();
        let preds = model.predict(&inputs());
        assert!(preds.len() <= 5);
        for pair in preds.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_no_spurious_predictions_for_neutral_input() {
        let model = InstrumentModel::load();
        let preds = model.predict(&ScalarInputs {
            centroid: 1700.0,
            rolloff: 4000.0,
            zero_crossing_rate: 0.07,
            rms_energy: 0.02,
            onset_strength: 0.05,
            loudness_db: -25.0,
            duration: 3.0,
        });
        assert!(preds.is_empty(), "unexpected predictions: {:?}", preds);
    }
}
