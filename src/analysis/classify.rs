//! One-shot vs. loop classification
//!
//! Multi-evidence weighted classifier. The design default is one-shot:
//! a loop verdict must be earned by converging evidence, because tagging a
//! drum hit as a loop costs more than the reverse mistake.
//!
//! Rules are a fixed-order declarative table of (predicate, weight, target)
//! entries over a precomputed evidence context, so adding or removing a
//! rule is a data change and each rule is independently testable.

use crate::analysis::features::energy::rms_envelope;
use crate::analysis::onset::{onset_strength, PeakPicker, STRICT_DELTA};
use crate::analysis::stft::Spectrogram;
use crate::types::{InstrumentPrediction, SampleVerdict, Waveform};
use tracing::debug;

/// Below this duration a sample is unconditionally a one-shot
pub const ONE_SHOT_DURATION_CEILING: f64 = 2.0;

/// Loop verdict requires at least this much loop evidence
pub const LOOP_THRESHOLD: f32 = 3.0;

/// Raised loop bar when percussion evidence fired without any loop/BPM
/// filename hint. The gap above [`LOOP_THRESHOLD`] was tuned empirically;
/// TODO: recalibrate both thresholds against the labeled sample set
/// instead of adjusting them by hand.
pub const PERCUSSION_LOOP_OVERRIDE: f32 = 8.0;

/// Instrument predictions at or above this confidence count as evidence
const INSTRUMENT_CONFIDENCE_FLOOR: f64 = 0.60;

/// Active-region threshold relative to peak RMS
const ACTIVE_RMS_RATIO: f32 = 0.03;

const PERCUSSION_KEYWORDS: &[&str] = &[
    "kick", "snare", "hat", "hihat", "clap", "crash", "ride", "tom", "perc", "cymbal", "rim",
    "shaker", "cowbell", "conga", "bongo", "tambourine",
];

const ONE_SHOT_KEYWORDS: &[&str] = &[
    "hit", "stab", "shot", "oneshot", "one-shot", "riser", "impact", "sweep", "fall", "drop",
];

const LOOP_KEYWORDS: &[&str] = &["loop", "groove", "beat", "break", "riff", "jam", "phrase"];

const PERCUSSION_INSTRUMENTS: &[&str] = &[
    "kick", "snare", "hihat", "percussion", "tom", "clap", "cymbal",
];

// =============================================================================
// Evidence accumulation
// =============================================================================

/// Which accumulator a rule feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    OneShot,
    Loop,
}

/// Non-negative evidence accumulators
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceScore {
    pub one_shot: f32,
    pub loop_: f32,
}

impl EvidenceScore {
    fn add(&mut self, target: Target, weight: f32) {
        match target {
            Target::OneShot => self.one_shot += weight,
            Target::Loop => self.loop_ += weight,
        }
    }
}

/// Everything the rule table looks at, computed once up front.
/// Fields derived from sub-computations that can fail are `Option`; a rule
/// over missing data simply doesn't fire.
#[derive(Debug, Default)]
struct EvidenceContext {
    duration: f64,
    // Filename
    percussion_keyword: bool,
    one_shot_keyword: bool,
    loop_keyword: bool,
    bpm_hint: bool,
    // Instruments
    percussive_instrument: bool,
    // Trimmed RMS envelope shape
    trim_fraction: Option<f32>,
    peak_position: Option<f32>,
    peak_to_tail: Option<f32>,
    coefficient_of_variation: Option<f32>,
    edge_correlation: Option<f32>,
    // Onsets
    onset_count: Option<usize>,
    autocorrelation_peak: Option<f32>,
}

struct Rule {
    name: &'static str,
    target: Target,
    weight: f32,
    predicate: fn(&EvidenceContext) -> bool,
}

/// Fixed evaluation order; weights were tuned by hand against a labeled
/// sample set.
const RULES: &[Rule] = &[
    Rule {
        name: "percussion_keyword",
        target: Target::OneShot,
        weight: 5.0,
        predicate: |c| c.percussion_keyword,
    },
    Rule {
        name: "one_shot_keyword",
        target: Target::OneShot,
        weight: 4.0,
        predicate: |c| c.one_shot_keyword,
    },
    Rule {
        name: "loop_keyword",
        target: Target::Loop,
        weight: 4.0,
        predicate: |c| c.loop_keyword,
    },
    Rule {
        name: "percussive_instrument",
        target: Target::OneShot,
        weight: 4.0,
        predicate: |c| c.percussive_instrument,
    },
    Rule {
        name: "large_silent_margin",
        target: Target::OneShot,
        weight: 1.5,
        predicate: |c| c.trim_fraction.is_some_and(|f| f > 0.25),
    },
    Rule {
        name: "early_peak_fast_decay",
        target: Target::OneShot,
        weight: 2.0,
        predicate: |c| {
            c.peak_position.is_some_and(|p| p < 0.30)
                && c.peak_to_tail.is_some_and(|r| r >= 3.0)
        },
    },
    Rule {
        name: "late_peak_riser",
        target: Target::OneShot,
        weight: 1.5,
        predicate: |c| c.peak_position.is_some_and(|p| p > 0.80),
    },
    Rule {
        name: "flat_envelope",
        target: Target::Loop,
        weight: 1.0,
        predicate: |c| {
            c.coefficient_of_variation.is_some_and(|cv| cv < 0.35)
                && c.peak_to_tail.is_some_and(|r| r < 1.3)
        },
    },
    Rule {
        name: "uncorrelated_edges",
        target: Target::OneShot,
        weight: 1.5,
        predicate: |c| c.edge_correlation.is_some_and(|r| r < 0.30),
    },
    Rule {
        name: "correlated_edges",
        target: Target::Loop,
        weight: 1.0,
        predicate: |c| c.edge_correlation.is_some_and(|r| r > 0.85),
    },
    Rule {
        name: "strong_periodicity",
        target: Target::Loop,
        weight: 1.5,
        predicate: |c| c.autocorrelation_peak.is_some_and(|p| p > 0.65),
    },
    Rule {
        name: "no_periodicity",
        target: Target::OneShot,
        weight: 1.0,
        predicate: |c| c.autocorrelation_peak.is_some_and(|p| p < 0.30),
    },
    Rule {
        name: "single_event",
        target: Target::OneShot,
        weight: 2.0,
        predicate: |c| c.onset_count.is_some_and(|n| n <= 1),
    },
    Rule {
        name: "many_events",
        target: Target::Loop,
        weight: 0.5,
        predicate: |c| c.onset_count.is_some_and(|n| n >= 4) && c.duration > 2.0,
    },
    Rule {
        name: "very_short",
        target: Target::OneShot,
        weight: 1.0,
        predicate: |c| c.duration < 1.0,
    },
    Rule {
        name: "very_long",
        target: Target::Loop,
        weight: 0.5,
        predicate: |c| c.duration > 8.0,
    },
];

// =============================================================================
// Classifier
// =============================================================================

/// Classify a prepared waveform as one-shot or loop.
///
/// `spectrogram` is the request's shared magnitude spectrogram (computed
/// once by the pipeline). `filename` is an optional naming hint;
/// `instruments` are pre-computed instrument predictions. Never errors:
/// sub-computations that fail just contribute no evidence.
pub fn classify(
    waveform: &Waveform,
    spectrogram: &Spectrogram,
    filename: Option<&str>,
    instruments: &[InstrumentPrediction],
) -> SampleVerdict {
    // Hard rule: short samples are one-shots, no further evidence needed
    if waveform.duration < ONE_SHOT_DURATION_CEILING {
        return SampleVerdict::one_shot(1.0);
    }

    let ctx = build_context(waveform, spectrogram, filename, instruments);

    let mut score = EvidenceScore::default();
    for rule in RULES {
        if (rule.predicate)(&ctx) {
            debug!(rule = rule.name, weight = rule.weight, "Evidence fired");
            score.add(rule.target, rule.weight);
        }
    }

    decide(&ctx, score)
}

fn decide(ctx: &EvidenceContext, score: EvidenceScore) -> SampleVerdict {
    // Isolated drum hits named "kick_03" etc. must not come out as loops:
    // when percussion evidence fired and the filename carries no loop/BPM
    // hint, the loop bar rises to the override threshold.
    let percussion_context = ctx.percussion_keyword || ctx.percussive_instrument;
    let loop_hint = ctx.loop_keyword || ctx.bpm_hint;

    let is_loop = if percussion_context && !loop_hint {
        score.loop_ > PERCUSSION_LOOP_OVERRIDE && score.loop_ > score.one_shot
    } else {
        score.loop_ >= LOOP_THRESHOLD && score.loop_ > score.one_shot
    };

    let total = score.one_shot + score.loop_;
    let confidence = if total > f32::EPSILON {
        ((score.one_shot - score.loop_).abs() / total) as f64
    } else {
        0.0
    };
    let confidence = confidence.clamp(0.0, 1.0);

    debug!(
        one_shot_score = score.one_shot,
        loop_score = score.loop_,
        is_loop,
        confidence,
        "Classification decided"
    );

    if is_loop {
        SampleVerdict::loop_(confidence)
    } else {
        SampleVerdict::one_shot(confidence)
    }
}

// =============================================================================
// Context construction
// =============================================================================

fn build_context(
    waveform: &Waveform,
    spectrogram: &Spectrogram,
    filename: Option<&str>,
    instruments: &[InstrumentPrediction],
) -> EvidenceContext {
    let mut ctx = EvidenceContext {
        duration: waveform.duration,
        ..Default::default()
    };

    if let Some(name) = filename {
        let lower = name.to_ascii_lowercase();
        ctx.percussion_keyword = PERCUSSION_KEYWORDS.iter().any(|k| lower.contains(k));
        ctx.one_shot_keyword = ONE_SHOT_KEYWORDS.iter().any(|k| lower.contains(k));
        ctx.loop_keyword = LOOP_KEYWORDS.iter().any(|k| lower.contains(k));
        ctx.bpm_hint = lower.contains("bpm");
    }

    // A percussion-like instrument at sufficient confidence, applied once
    ctx.percussive_instrument = instruments.iter().any(|p| {
        p.confidence >= INSTRUMENT_CONFIDENCE_FLOOR
            && PERCUSSION_INSTRUMENTS
                .iter()
                .any(|k| p.name.eq_ignore_ascii_case(k))
    });

    // Onsets at the stricter prominence threshold
    let envelope = onset_strength(spectrogram);
    let picker = PeakPicker::for_sample_rate(waveform.sample_rate).with_delta(STRICT_DELTA);
    let onsets = picker.pick(&envelope);
    ctx.onset_count = Some(onsets.len());
    ctx.autocorrelation_peak = autocorrelation_peak(&envelope);

    // Trimmed RMS envelope shape
    let rms = rms_envelope(&waveform.samples);
    if rms.len() >= 4 {
        let peak_rms = rms.iter().fold(0.0f32, |m, &v| m.max(v));
        if peak_rms > 0.0 {
            let threshold = peak_rms * ACTIVE_RMS_RATIO;
            let rms_start = rms.iter().position(|&v| v >= threshold);
            let rms_end = rms.iter().rposition(|&v| v >= threshold);

            // The active region is the UNION of the above-threshold span
            // and the first..last onset span; either method alone can
            // over-trim real content.
            let mut start = rms_start.unwrap_or(0);
            let mut end = rms_end.map_or(rms.len() - 1, |e| e);
            if let (Some(f), Some(l)) = (onsets.first(), onsets.last()) {
                start = start.min(f.min(rms.len() - 1));
                end = end.max(l.min(rms.len() - 1));
            }

            if end > start {
                let active = &rms[start..=end];
                ctx.trim_fraction = Some(1.0 - active.len() as f32 / rms.len() as f32);
                fill_envelope_shape(&mut ctx, active);
            }
        }
    }

    ctx
}

/// Peak position, decay ratio, flatness, and edge correlation of the
/// active (trimmed) RMS region
fn fill_envelope_shape(ctx: &mut EvidenceContext, active: &[f32]) {
    let n = active.len();
    let (peak_idx, &peak) = match active
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    {
        Some(p) => p,
        None => return,
    };

    ctx.peak_position = Some(peak_idx as f32 / n as f32);

    // Tail: final 20% of the active region
    let tail_start = n - (n / 5).max(1);
    let tail = &active[tail_start..];
    let tail_mean = tail.iter().sum::<f32>() / tail.len() as f32;
    ctx.peak_to_tail = Some(peak / (tail_mean + 1e-6));

    let mean = active.iter().sum::<f32>() / n as f32;
    if mean > 0.0 {
        let variance = active.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32;
        ctx.coefficient_of_variation = Some(variance.sqrt() / mean);
    }

    // First vs. last ~8% of active frames
    let edge = ((n as f32 * 0.08) as usize).max(2);
    if n >= edge * 2 {
        ctx.edge_correlation = correlation(&active[..edge], &active[n - edge..]);
    }
}

/// Pearson correlation; `None` when either side is constant
fn correlation(a: &[f32], b: &[f32]) -> Option<f32> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = a.iter().sum::<f32>() / n as f32;
    let mean_b = b.iter().sum::<f32>() / n as f32;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f32::EPSILON {
        return None;
    }
    Some(cov / denom)
}

/// Strongest lag-normalized autocorrelation peak of the onset envelope,
/// ignoring the first 10% of lags to avoid zero-lag bleed
fn autocorrelation_peak(envelope: &[f32]) -> Option<f32> {
    let n = envelope.len();
    if n < 8 {
        return None;
    }
    let peak = envelope.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
    let mean = envelope.iter().sum::<f32>() / n as f32;
    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();

    let zero_lag: f32 = centered.iter().map(|v| v * v).sum();
    // Scale-relative floor so a constant envelope's f32 rounding residue
    // cannot register as periodic energy
    if zero_lag <= n as f32 * peak * peak * 1e-6 {
        return None;
    }

    let min_lag = (n / 10).max(1);
    let max_lag = n / 2;
    let mut best = 0.0f32;
    for lag in min_lag..max_lag {
        let ac: f32 = centered[..n - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum();
        best = best.max(ac / zero_lag);
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stft::magnitude_spectrogram;

    fn classify_samples(
        samples: Vec<f32>,
        filename: Option<&str>,
        instruments: &[InstrumentPrediction],
    ) -> SampleVerdict {
        let waveform = Waveform::new(samples, 44_100);
        let spec = magnitude_spectrogram(&waveform.samples, waveform.sample_rate);
        classify(&waveform, &spec, filename, instruments)
    }

    /// Click track: short decaying bursts at a fixed interval
    fn click_track(duration_secs: f64, interval_secs: f64) -> Vec<f32> {
        let sr = 44_100.0;
        let n = (duration_secs * sr) as usize;
        let period = (interval_secs * sr) as usize;
        let click_len = (0.005 * sr) as usize;
        (0..n)
            .map(|i| {
                let pos = i % period;
                if pos < click_len {
                    0.8 * (-5.0 * pos as f32 / click_len as f32).exp()
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Single exponentially decaying 200 Hz transient
    fn decaying_transient(duration_secs: f64) -> Vec<f32> {
        let sr = 44_100.0;
        let n = (duration_secs * sr) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sr as f32;
                (-8.0 * t).exp() * (2.0 * std::f32::consts::PI * 200.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_short_duration_is_unconditionally_one_shot() {
        // 0.5s of anything, even named like a loop
        let verdict = classify_samples(click_track(0.5, 0.1), Some("drum_loop_140bpm.wav"), &[]);
        assert!(verdict.is_one_shot);
        assert!(!verdict.is_loop);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn test_verdict_is_always_mutually_exclusive() {
        for (samples, name) in [
            (click_track(10.0, 0.5), Some("groove_loop.wav")),
            (decaying_transient(0.8), Some("kick_01.wav")),
            (vec![0.0; 44_100 * 3], None),
            (click_track(4.0, 0.25), None),
        ] {
            let v = classify_samples(samples, name, &[]);
            assert_ne!(v.is_one_shot, v.is_loop);
        }
    }

    #[test]
    fn test_periodic_click_track_named_loop_is_loop() {
        let verdict = classify_samples(click_track(10.0, 0.5), Some("groove_loop.wav"), &[]);
        assert!(verdict.is_loop, "expected loop, got {:?}", verdict);
    }

    #[test]
    fn test_single_decaying_transient_is_confident_one_shot() {
        let verdict = classify_samples(decaying_transient(0.8), Some("kick_01.wav"), &[]);
        assert!(verdict.is_one_shot);
        assert!(verdict.confidence > 0.5);
    }

    #[test]
    fn test_percussion_override_blocks_loop_for_drum_hits() {
        // Long periodic material, but percussion-named with no loop hint:
        // loop evidence can't realistically clear the raised bar
        let verdict = classify_samples(click_track(4.0, 0.5), Some("snare_roll_03.wav"), &[]);
        assert!(verdict.is_one_shot);
    }

    #[test]
    fn test_percussive_instrument_counts_once() {
        let instruments = vec![
            InstrumentPrediction {
                name: "kick".into(),
                confidence: 0.9,
            },
            InstrumentPrediction {
                name: "snare".into(),
                confidence: 0.8,
            },
        ];
        let waveform = Waveform::new(click_track(3.0, 0.5), 44_100);
        let spec = magnitude_spectrogram(&waveform.samples, waveform.sample_rate);
        let ctx = build_context(&waveform, &spec, None, &instruments);
        assert!(ctx.percussive_instrument);
        // One boolean, so the 4.0 weight can only be applied once
        let fired: Vec<_> = RULES
            .iter()
            .filter(|r| r.name == "percussive_instrument" && (r.predicate)(&ctx))
            .collect();
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn test_autocorrelation_peak_detects_periodicity() {
        let periodic: Vec<f32> = (0..200).map(|i| if i % 20 == 0 { 1.0 } else { 0.0 }).collect();
        let peak = autocorrelation_peak(&periodic).unwrap();
        assert!(peak > 0.65, "autocorrelation peak {} too low", peak);

        let flat = vec![0.2f32; 200];
        assert!(autocorrelation_peak(&flat).is_none());
        assert!(autocorrelation_peak(&vec![0.3f32; 1_000]).is_none());
    }

    #[test]
    fn test_correlation_bounds() {
        let a = [0.1, 0.5, 0.9, 0.4];
        assert!((correlation(&a, &a).unwrap() - 1.0).abs() < 1e-5);
        let b: Vec<f32> = a.iter().map(|v| -v).collect();
        assert!((correlation(&a, &b).unwrap() + 1.0).abs() < 1e-5);
        assert!(correlation(&[0.5, 0.5, 0.5], &a[..3]).is_none());
    }

}
