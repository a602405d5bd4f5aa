//! Feature extractor registry
//!
//! Each extractor is a pure function over the waveform (plus explicitly
//! threaded precomputed intermediates) returning `Result`; the pipeline
//! degrades any failure to a null field. Extractors never mutate their
//! input and never panic on degenerate audio.

pub mod energy;
pub mod envelope;
pub mod fingerprint;
pub mod genre;
pub mod instruments;
pub mod loudness;
pub mod models;
pub mod rhythm;
pub mod spectral;
pub mod stereo;
pub mod timbral;

pub use models::ModelCache;
