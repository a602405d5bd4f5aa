//! Core data types for sampletag
//!
//! These types represent the domain model and flow through the pipeline.

use serde::{Deserialize, Serialize};

/// Hop size in samples for all frame-based analysis (onset envelope, RMS)
pub const HOP_SIZE: usize = 512;

/// STFT window size for spectral analysis
pub const FRAME_SIZE: usize = 2048;

// =============================================================================
// Audio buffers
// =============================================================================

/// Decoded mono audio ready for analysis
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Stereo channel pair retained from decoding when the source has two channels.
/// Used only for stereo-field analysis; all other extractors run on mono.
#[derive(Debug, Clone)]
pub struct StereoPair {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

/// One request's audio, preprocessed and ready for the pipeline.
///
/// `processed` has DC offset removed, edge silence trimmed, and peaks
/// normalized. `raw` is the untouched decode output, kept because LUFS
/// measurement needs absolute level.
#[derive(Debug, Clone)]
pub struct PreparedAudio {
    pub processed: Waveform,
    pub raw: Waveform,
    pub stereo: Option<StereoPair>,
}

// =============================================================================
// Onset events
// =============================================================================

/// Ordered, strictly increasing onset frame indices.
///
/// Invariant: indices are monotonic and separated by at least the picker's
/// configured minimum wait. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    frames: Vec<usize>,
}

impl EventSet {
    pub fn new(frames: Vec<usize>) -> Self {
        debug_assert!(frames.windows(2).all(|w| w[0] < w[1]));
        Self { frames }
    }

    pub fn empty() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn frames(&self) -> &[usize] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> Option<usize> {
        self.frames.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.frames.last().copied()
    }

    /// Convert frame indices to times in seconds
    pub fn to_times(&self, sample_rate: u32, hop_size: usize) -> Vec<f64> {
        let frame_secs = hop_size as f64 / sample_rate as f64;
        self.frames.iter().map(|&f| f as f64 * frame_secs).collect()
    }
}

// =============================================================================
// Classification
// =============================================================================

/// One-shot vs. loop verdict. `is_one_shot` and `is_loop` are always
/// mutually exclusive; exactly one is true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleVerdict {
    pub is_one_shot: bool,
    pub is_loop: bool,
    /// Margin-based confidence in [0, 1]
    pub confidence: f64,
}

impl SampleVerdict {
    pub fn one_shot(confidence: f64) -> Self {
        Self {
            is_one_shot: true,
            is_loop: false,
            confidence,
        }
    }

    pub fn loop_(confidence: f64) -> Self {
        Self {
            is_one_shot: false,
            is_loop: true,
            confidence,
        }
    }
}

/// A single labeled instrument prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPrediction {
    pub name: String,
    pub confidence: f64,
}

// =============================================================================
// Analysis level
// =============================================================================

/// Requested analysis tier.
///
/// Historically this selected among multiple tiers; only the advanced tier
/// is exposed today. The parameter is kept in the interface for forward
/// compatibility, and unrecognized values fall back to `Advanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisLevel {
    #[default]
    Advanced,
}

impl AnalysisLevel {
    pub fn parse(s: &str) -> Self {
        // All historical tier names map to the one exposed tier
        let _ = s;
        AnalysisLevel::Advanced
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisLevel::Advanced => "advanced",
        }
    }
}

// =============================================================================
// Analysis result record
// =============================================================================

/// Complete analysis result for a single sample.
///
/// Flat schema: every advanced-tier field is always present in the JSON
/// output, serialized as `null` when its capability is disabled or its
/// extractor failed. Consumers rely on key presence regardless of
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    // --- Basic properties ---
    pub duration: f64,
    pub sample_rate: u32,

    // --- Classification ---
    pub is_one_shot: bool,
    pub is_loop: bool,
    pub classification_confidence: f64,
    pub onset_count: usize,

    // --- Spectral (core tier) ---
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub spectral_bandwidth: f64,
    pub spectral_contrast: f64,
    pub zero_crossing_rate: f64,
    pub mfcc_mean: Vec<f64>,

    // --- Energy (core tier) ---
    pub rms_energy: f64,
    pub loudness_db: f64,
    pub dynamic_range: f64,
    pub onset_strength: f64,

    // --- Rhythm (advanced tier) ---
    pub bpm: Option<f64>,
    pub beats_count: Option<u32>,
    pub danceability: Option<f64>,

    // --- Timbral (advanced tier) ---
    pub brightness: Option<f64>,
    pub warmth: Option<f64>,
    pub roughness: Option<f64>,
    pub harmonic_ratio: Option<f64>,
    pub percussive_ratio: Option<f64>,
    pub transient_punch: Option<f64>,

    // --- Envelope (advanced tier) ---
    pub attack_time: Option<f64>,
    pub decay_time: Option<f64>,
    pub sustain_level: Option<f64>,
    pub release_time: Option<f64>,

    // --- Stereo (advanced tier; null for mono sources) ---
    pub stereo_width: Option<f64>,

    // --- Loudness (advanced tier) ---
    pub integrated_lufs: Option<f64>,
    pub loudness_range: Option<f64>,

    // --- Events (advanced tier) ---
    pub event_times: Option<Vec<f64>>,

    // --- Models (advanced tier) ---
    pub instrument_predictions: Vec<InstrumentPrediction>,
    pub genre_predictions: Option<Vec<InstrumentPrediction>>,
    pub mood: Option<String>,

    // --- Fingerprint (advanced tier) ---
    pub fingerprint: Option<String>,

    // --- Derived tags ---
    pub suggested_tags: Vec<String>,

    // --- Analysis metadata ---
    pub analysis_duration_ms: u64,
    pub analyzed_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_duration() {
        let w = Waveform::new(vec![0.0; 44_100], 44_100);
        assert!((w.duration - 1.0).abs() < 1e-9);
        let zero_rate = Waveform::new(vec![0.0; 100], 0);
        assert_eq!(zero_rate.duration, 0.0);
    }

    #[test]
    fn test_event_set_times() {
        let events = EventSet::new(vec![0, 86, 172]);
        let times = events.to_times(44_100, 512);
        assert!((times[0] - 0.0).abs() < 1e-9);
        assert!((times[1] - 86.0 * 512.0 / 44_100.0).abs() < 1e-9);
        assert_eq!(events.first(), Some(0));
        assert_eq!(events.last(), Some(172));
    }

    #[test]
    fn test_verdict_mutual_exclusion() {
        let os = SampleVerdict::one_shot(1.0);
        assert!(os.is_one_shot && !os.is_loop);
        let lp = SampleVerdict::loop_(0.4);
        assert!(!lp.is_one_shot && lp.is_loop);
    }

    #[test]
    fn test_level_parse_is_forward_compatible() {
        assert_eq!(AnalysisLevel::parse("advanced"), AnalysisLevel::Advanced);
        assert_eq!(AnalysisLevel::parse("basic"), AnalysisLevel::Advanced);
        assert_eq!(AnalysisLevel::parse("??"), AnalysisLevel::Advanced);
    }
}
