//! sampletag - Audio sample analysis and auto-tagging engine
//!
//! Analyzes audio samples (one-shots, loops, full tracks) into a flat
//! feature record: spectral and energy descriptors, onset events, tempo,
//! timbre, loudness, heuristic instrument/genre predictions, a one-shot
//! vs. loop verdict, and a derived semantic tag list.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and capability switches
//! - `audio`: Decoding (symphonia) and preprocessing
//! - `analysis`: STFT, onset detection, classification, feature extractors
//! - `pipeline`: Per-request staged orchestration with degradation
//! - `worker`: Persistent line-delimited JSON request loop
//!
//! # Example
//!
//! ```no_run
//! use sampletag::config::CapabilityConfig;
//! use sampletag::pipeline::AnalysisPipeline;
//! use sampletag::types::AnalysisLevel;
//! use std::path::Path;
//!
//! let pipeline = AnalysisPipeline::new(CapabilityConfig::from_env());
//! let record = pipeline
//!     .analyze(Path::new("kick.wav"), AnalysisLevel::Advanced, None)
//!     .expect("Analysis failed");
//! println!("{} tags", record.suggested_tags.len());
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod worker;

// Re-export key types at crate root
pub use error::{Result, SampletagError};
pub use types::{AnalysisLevel, FeatureRecord, SampleVerdict, Waveform};
