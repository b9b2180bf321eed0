use thiserror::Error;

/// Top-level error type for the Sotto system.
///
/// Each variant wraps a subsystem-specific failure as a message. Subsystem
/// crates define their own error types where they need richer structure and
/// implement `From<SubsystemError> for SottoError` so that the `?` operator
/// works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SottoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio capture error: {0}")]
    Audio(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Text insertion error: {0}")]
    Insertion(String),

    #[error("Dictation error: {0}")]
    Dictation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SottoError {
    fn from(err: toml::de::Error) -> Self {
        SottoError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SottoError {
    fn from(err: toml::ser::Error) -> Self {
        SottoError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SottoError {
    fn from(err: serde_json::Error) -> Self {
        SottoError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sotto operations.
pub type Result<T> = std::result::Result<T, SottoError>;
