//! Audio decoding and preprocessing

pub mod decoder;
pub mod preprocess;

pub use decoder::{decode, DecodedAudio, TARGET_SAMPLE_RATE};
pub use preprocess::prepare;
