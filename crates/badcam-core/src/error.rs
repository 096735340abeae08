//! Error types for BadCam

use thiserror::Error;

/// Main error type for BadCam operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Frame source ended: {0}")]
    EndOfStream(String),

    #[error("Frame sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Recompression failed: {0}")]
    Codec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using BadCam's Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::ConfigInvalid(message.into())
    }

    /// Whether the pacing loop may carry on after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::SourceUnavailable(_))
    }
}
