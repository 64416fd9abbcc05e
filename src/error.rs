//! Error types for HRV Flux

use thiserror::Error;

/// Errors that can occur during computation
///
/// A session that fails validation is not an error: it is reported through
/// [`crate::types::ValidationResult`]. These variants cover malformed input,
/// configuration problems and numerically degenerate data.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse session payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Insufficient samples for spectral analysis: need {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Degenerate spectrum: {0}")]
    DegenerateSpectrum(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl From<toml::de::Error> for ComputeError {
    fn from(e: toml::de::Error) -> Self {
        ComputeError::ConfigError(e.to_string())
    }
}
