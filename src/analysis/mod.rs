//! Audio analysis core
//!
//! One shared magnitude spectrogram feeds the onset detector, the
//! one-shot/loop classifier, and every feature extractor.

pub mod classify;
pub mod features;
pub mod onset;
pub mod stft;
pub mod tags;
