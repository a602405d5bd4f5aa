//! Unified error types for sampletag
//!
//! Error strategy:
//! - Request-shape errors (bad path, malformed line): per-request, worker stays alive
//! - Extractor-local failures: caught at the call site, degraded to a null field
//! - Pipeline-fatal errors (decode, preprocess): abort the single request
//! - Startup errors (config): fatal to the whole process at launch

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF, OGG, AAC";

/// Top-level error type for sampletag operations
#[derive(Debug, Error)]
pub enum SampletagError {
    // =========================================================================
    // Request-shape errors - reject the request, keep serving
    // =========================================================================
    #[error("File not found: '{0}'")]
    FileNotFound(PathBuf),

    #[error("Path is not a file: '{0}'")]
    NotAFile(PathBuf),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unknown command: '{0}'")]
    UnknownCommand(String),

    // =========================================================================
    // Pipeline-fatal errors - abort this request, keep serving
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Audio analysis failed for '{path}': {reason}")]
    AnalysisError { path: PathBuf, reason: String },

    #[error("Audio is empty after decoding: '{0}'")]
    EmptyAudio(PathBuf),

    // =========================================================================
    // Extractor-local failures - caught by the orchestrator, become null fields
    // =========================================================================
    #[error("Feature extraction failed ({feature}): {reason}")]
    FeatureError {
        feature: &'static str,
        reason: String,
    },

    // =========================================================================
    // Startup errors - fatal to the whole process
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sampletag operations
pub type Result<T> = std::result::Result<T, SampletagError>;

impl SampletagError {
    /// Returns true if this error is scoped to a single request
    /// (the worker loop continues after reporting it)
    pub fn is_request_scoped(&self) -> bool {
        !matches!(
            self,
            SampletagError::ConfigError(_) | SampletagError::Io(_)
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SampletagError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an extractor-local failure for the named feature
    pub fn feature_error(feature: &'static str, reason: impl Into<String>) -> Self {
        SampletagError::FeatureError {
            feature,
            reason: reason.into(),
        }
    }
}

/// Extension trait for adding file context to errors
pub trait ErrorContext<T> {
    /// Wrap an error with the path of the file being analyzed
    fn with_file_context(self, path: &std::path::Path) -> Result<T>;
}

impl<T, E: std::fmt::Display> ErrorContext<T> for std::result::Result<T, E> {
    fn with_file_context(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| SampletagError::AnalysisError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
