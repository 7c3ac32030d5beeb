//! Error types for the Lumen gateway

use thiserror::Error;

/// Result type alias for Lumen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Lumen gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Fatal startup failure: keyword engine assets could not be
    /// synchronized or the model could not be loaded. Never retried
    /// automatically.
    #[error("initialization error: {0}")]
    Init(String),

    /// Keyword engine fault during listening
    #[error("keyword engine error: {0}")]
    Engine(String),

    /// Remote dictation failure (network, no speech, malformed result)
    #[error("dictation error: {0}")]
    Dictation(String),

    /// Dictation turn exceeded the configured deadline
    #[error("dictation timed out after {0}s")]
    DictationTimeout(u64),

    /// Command sink error
    #[error("sink error: {0}")]
    Sink(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error prevents the gateway from ever becoming
    /// operative. Only init failures qualify; everything else is absorbed
    /// at the orchestrator boundary.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_))
    }
}
