//! Semantic tag generation
//!
//! Maps numeric features onto a flat list of browse-friendly tags. Pure
//! function of the assembled record; thresholds are tuned for typical
//! sample-pack material.

use crate::types::FeatureRecord;

/// Instrument predictions below this confidence do not become tags
const INSTRUMENT_TAG_CONFIDENCE: f64 = 0.55;

/// Derive the suggested tag list from an assembled feature record.
///
/// Tag order is stable and duplicates are removed keeping first occurrence.
pub fn generate_tags(record: &FeatureRecord) -> Vec<String> {
    let mut tags: Vec<&str> = Vec::new();

    if record.is_one_shot {
        tags.push("one-shot");
    }
    if record.is_loop {
        tags.push("loop");
    }

    // Tempo tags only make sense for loops
    if let Some(bpm) = record.bpm {
        if record.is_loop {
            if bpm < 80.0 {
                tags.extend(["slow", "60-80bpm"]);
            } else if bpm < 100.0 {
                tags.extend(["downtempo", "80-100bpm"]);
            } else if bpm < 120.0 {
                tags.extend(["midtempo", "100-120bpm"]);
            } else if bpm < 140.0 {
                tags.extend(["uptempo", "120-140bpm"]);
            } else {
                tags.extend(["fast", "140+bpm"]);
            }
        }
    }

    if record.spectral_centroid > 3500.0 {
        tags.push("bright");
    } else if record.spectral_centroid > 1500.0 {
        tags.push("mid-range");
    } else {
        tags.push("dark");
    }

    if record.spectral_rolloff < 2000.0 {
        tags.push("bass-heavy");
    } else if record.spectral_rolloff > 8000.0 {
        tags.push("high-freq");
    }

    if record.is_one_shot && record.rms_energy > 0.1 {
        tags.push("punchy");
    } else if record.rms_energy < 0.05 {
        tags.push("soft");
    }

    if record.loudness_db > -10.0 {
        tags.push("aggressive");
    } else if record.loudness_db < -30.0 {
        tags.push("ambient");
    }

    if record.dynamic_range > 30.0 {
        tags.push("dynamic");
    } else if record.dynamic_range < 10.0 {
        tags.push("compressed");
    }

    if record.zero_crossing_rate > 0.12 {
        tags.push("noisy");
    } else if record.zero_crossing_rate < 0.05 {
        tags.push("smooth");
    }

    let mut out: Vec<String> = tags.into_iter().map(str::to_owned).collect();
    for pred in &record.instrument_predictions {
        if pred.confidence > INSTRUMENT_TAG_CONFIDENCE {
            out.push(pred.name.clone());
        }
    }

    dedup_preserving_order(out)
}

fn dedup_preserving_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InstrumentPrediction;

    fn base_record() -> FeatureRecord {
        FeatureRecord {
            duration: 1.0,
            sample_rate: 44_100,
            is_one_shot: true,
            is_loop: false,
            classification_confidence: 0.8,
            onset_count: 1,
            spectral_centroid: 2000.0,
            spectral_rolloff: 4000.0,
            spectral_bandwidth: 1000.0,
            spectral_contrast: 10.0,
            zero_crossing_rate: 0.08,
            mfcc_mean: vec![0.0; 13],
            rms_energy: 0.08,
            loudness_db: -20.0,
            dynamic_range: 20.0,
            onset_strength: 0.2,
            bpm: None,
            beats_count: None,
            danceability: None,
            brightness: None,
            warmth: None,
            roughness: None,
            harmonic_ratio: None,
            percussive_ratio: None,
            transient_punch: None,
            attack_time: None,
            decay_time: None,
            sustain_level: None,
            release_time: None,
            stereo_width: None,
            integrated_lufs: None,
            loudness_range: None,
            event_times: None,
            instrument_predictions: Vec::new(),
            genre_predictions: None,
            mood: None,
            fingerprint: None,
            suggested_tags: Vec::new(),
            analysis_duration_ms: 0,
            analyzed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_one_shot_gets_punchy_tag() {
        let mut r = base_record();
        r.rms_energy = 0.2;
        let tags = generate_tags(&r);
        assert!(tags.contains(&"one-shot".to_string()));
        assert!(tags.contains(&"punchy".to_string()));
        assert!(!tags.contains(&"loop".to_string()));
    }

    #[test]
    fn test_bpm_tags_only_for_loops() {
        let mut r = base_record();
        r.bpm = Some(128.0);
        assert!(!generate_tags(&r).contains(&"uptempo".to_string()));

        r.is_one_shot = false;
        r.is_loop = true;
        let tags = generate_tags(&r);
        assert!(tags.contains(&"uptempo".to_string()));
        assert!(tags.contains(&"120-140bpm".to_string()));
    }

    #[test]
    fn test_brightness_bands() {
        let mut r = base_record();
        r.spectral_centroid = 4000.0;
        assert!(generate_tags(&r).contains(&"bright".to_string()));
        r.spectral_centroid = 800.0;
        assert!(generate_tags(&r).contains(&"dark".to_string()));
    }

    #[test]
    fn test_instrument_tags_respect_confidence_floor() {
        let mut r = base_record();
        r.instrument_predictions = vec![
            InstrumentPrediction {
                name: "kick".into(),
                confidence: 0.9,
            },
            InstrumentPrediction {
                name: "snare".into(),
                confidence: 0.4,
            },
        ];
        let tags = generate_tags(&r);
        assert!(tags.contains(&"kick".to_string()));
        assert!(!tags.contains(&"snare".to_string()));
    }

    #[test]
    fn test_tags_are_deduplicated_in_order() {
        let mut r = base_record();
        // "dark" from centroid band, "kick" would repeat via duplicate preds
        r.spectral_centroid = 800.0;
        r.instrument_predictions = vec![
            InstrumentPrediction {
                name: "kick".into(),
                confidence: 0.9,
            },
            InstrumentPrediction {
                name: "kick".into(),
                confidence: 0.8,
            },
        ];
        let tags = generate_tags(&r);
        let kicks = tags.iter().filter(|t| t.as_str() == "kick").count();
        assert_eq!(kicks, 1);
        assert_eq!(tags.first().map(String::as_str), Some("one-shot"));
    }
}
