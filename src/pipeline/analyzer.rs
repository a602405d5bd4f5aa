//! Staged analysis orchestrator
//!
//! Runs decode, preprocessing, the shared spectral transforms, the
//! classifier, and every feature extractor for a single request.
//!
//! Degradation policy: the core tier (decode, spectral, energy,
//! classification) must succeed or the request fails. Everything in the
//! advanced tier is individually guarded; a failing or disabled extractor
//! logs a warning and leaves its fields `null` without affecting the rest
//! of the record.

use crate::analysis::features::{
    energy, envelope, fingerprint, instruments, loudness, models::ModelCache, rhythm, spectral,
    stereo, timbral,
};
use crate::analysis::{classify, onset, stft, tags};
use crate::audio;
use crate::config::CapabilityConfig;
use crate::error::{ErrorContext, Result, SampletagError};
use crate::types::{AnalysisLevel, FeatureRecord, InstrumentPrediction, HOP_SIZE};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// Tempo estimation is skipped below this duration; the autocorrelation
/// window is too short to be trustworthy
const MIN_TEMPO_DURATION_SECS: f64 = 1.5;

/// One reusable analysis pipeline. Holds the capability switches and the
/// lazily-loaded model cache; `analyze` can be called for any number of
/// requests.
pub struct AnalysisPipeline {
    capabilities: CapabilityConfig,
    models: ModelCache,
}

impl AnalysisPipeline {
    pub fn new(capabilities: CapabilityConfig) -> Self {
        Self {
            capabilities,
            models: ModelCache::new(),
        }
    }

    /// Analyze a single audio file into a complete feature record.
    ///
    /// `filename` overrides the path's file name as the keyword-evidence
    /// hint; worker clients pass the original upload name here.
    pub fn analyze(
        &self,
        path: &Path,
        level: AnalysisLevel,
        filename: Option<&str>,
    ) -> Result<FeatureRecord> {
        let start = Instant::now();
        validate_path(path)?;

        let name_owned;
        let name_hint = match filename {
            Some(n) => Some(n),
            None => {
                name_owned = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                name_owned.as_deref()
            }
        };

        debug!(path = %path.display(), level = level.as_str(), "Starting analysis");

        // Core tier: any failure here aborts the request
        let decoded = audio::decode(path)?;
        let prepared = audio::prepare(decoded, path)?;
        let wave = &prepared.processed;
        let sr = wave.sample_rate;

        let spectrogram = stft::magnitude_spectrogram(&wave.samples, sr);
        let onset_envelope = onset::onset_strength(&spectrogram);
        let rms = energy::rms_envelope(&wave.samples);

        let picker = onset::PeakPicker::for_sample_rate(sr);
        let onsets = picker.pick_backtracked(&onset_envelope, &rms);

        let spectral = spectral::extract(wave, &spectrogram).with_file_context(path)?;
        let energy = energy::extract(wave, &onset_envelope).with_file_context(path)?;

        let scalar_inputs = instruments::ScalarInputs {
            centroid: spectral.centroid,
            rolloff: spectral.rolloff,
            zero_crossing_rate: spectral.zero_crossing_rate,
            rms_energy: energy.rms_energy,
            onset_strength: energy.onset_strength,
            loudness_db: energy.loudness_db,
            duration: wave.duration,
        };

        let instrument_predictions: Vec<InstrumentPrediction> = if self.capabilities.models_enabled
        {
            self.models.instrument().predict(&scalar_inputs)
        } else {
            debug!("Model capability disabled, skipping instrument prediction");
            Vec::new()
        };

        let verdict = classify::classify(wave, &spectrogram, name_hint, &instrument_predictions);

        // Advanced tier: each extractor degrades to null independently
        let rhythm = if verdict.is_loop && wave.duration > MIN_TEMPO_DURATION_SECS {
            guard("rhythm", rhythm::extract(&onset_envelope, sr, wave.duration))
        } else {
            debug!("Skipping tempo estimation (one-shot or too short)");
            None
        };
        let danceability = rhythm.as_ref().map(rhythm::danceability);

        let timbral = if self.capabilities.timbral_enabled {
            guard("timbral", timbral::extract(&spectrogram))
        } else {
            debug!("Timbral capability disabled");
            None
        };
        let transient_punch = timbral
            .as_ref()
            .and_then(|t| guard("transient_punch", timbral::transient_punch(&t.percussive_envelope)));

        let adsr = guard("envelope", envelope::extract(wave));

        let stereo_width = prepared
            .stereo
            .as_ref()
            .and_then(|pair| guard("stereo", stereo::stereo_width(pair)));

        // LUFS is measured on the unprocessed waveform; normalization
        // would destroy the absolute level
        let lufs = guard("loudness", loudness::extract(&prepared.raw));

        let (genre_predictions, mood) = if self.capabilities.models_enabled {
            let bpm = rhythm.as_ref().map(|r| r.bpm);
            let model = self.models.genre();
            let preds = model.predict(&scalar_inputs, bpm);
            let mood = model.mood(
                energy.loudness_db,
                timbral.as_ref().map(|t| t.brightness),
            );
            (Some(preds), Some(mood))
        } else {
            (None, None)
        };

        let fp = if self.capabilities.fingerprint_enabled {
            guard("fingerprint", fingerprint::fingerprint(&spectrogram))
        } else {
            debug!("Fingerprint capability disabled");
            None
        };

        let mut record = FeatureRecord {
            duration: wave.duration,
            sample_rate: sr,
            is_one_shot: verdict.is_one_shot,
            is_loop: verdict.is_loop,
            classification_confidence: verdict.confidence,
            onset_count: onsets.len(),
            spectral_centroid: spectral.centroid,
            spectral_rolloff: spectral.rolloff,
            spectral_bandwidth: spectral.bandwidth,
            spectral_contrast: spectral.contrast,
            zero_crossing_rate: spectral.zero_crossing_rate,
            mfcc_mean: spectral.mfcc_mean,
            rms_energy: energy.rms_energy,
            loudness_db: energy.loudness_db,
            dynamic_range: energy.dynamic_range,
            onset_strength: energy.onset_strength,
            bpm: rhythm.as_ref().map(|r| r.bpm),
            beats_count: rhythm.as_ref().map(|r| r.beats_count),
            danceability,
            brightness: timbral.as_ref().map(|t| t.brightness),
            warmth: timbral.as_ref().map(|t| t.warmth),
            roughness: timbral.as_ref().map(|t| t.roughness),
            harmonic_ratio: timbral.as_ref().map(|t| t.harmonic_ratio),
            percussive_ratio: timbral.as_ref().map(|t| t.percussive_ratio),
            transient_punch,
            attack_time: adsr.as_ref().map(|a| a.attack_time),
            decay_time: adsr.as_ref().map(|a| a.decay_time),
            sustain_level: adsr.as_ref().map(|a| a.sustain_level),
            release_time: adsr.as_ref().map(|a| a.release_time),
            stereo_width,
            integrated_lufs: lufs.as_ref().map(|l| l.integrated_lufs),
            loudness_range: lufs.as_ref().and_then(|l| l.loudness_range),
            event_times: Some(onsets.to_times(sr, HOP_SIZE)),
            instrument_predictions,
            genre_predictions,
            mood,
            fingerprint: fp,
            suggested_tags: Vec::new(),
            analysis_duration_ms: 0,
            analyzed_at: chrono::Utc::now(),
        };

        record.suggested_tags = tags::generate_tags(&record);
        record.analysis_duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            path = %path.display(),
            duration_ms = record.analysis_duration_ms,
            one_shot = record.is_one_shot,
            "Analysis complete"
        );

        Ok(record)
    }
}

fn validate_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SampletagError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(SampletagError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Run an advanced-tier extractor, degrading failure to `None` with a
/// warning instead of failing the request
fn guard<T>(feature: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(feature, error = %e, "Extractor failed, field degraded to null");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_missing() {
        let err = validate_path(Path::new("/nonexistent/kick.wav"));
        assert!(matches!(err, Err(SampletagError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_path_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_path(dir.path());
        assert!(matches!(err, Err(SampletagError::NotAFile(_))));
    }

    #[test]
    fn test_guard_degrades_to_none() {
        let ok: Option<i32> = guard("x", Ok(1));
        assert_eq!(ok, Some(1));
        let failed: Option<i32> =
            guard("x", Err(SampletagError::feature_error("x", "bad")));
        assert_eq!(failed, None);
    }
}
