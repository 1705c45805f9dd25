use thiserror::Error;

/// Top-level error type for Sosie.
#[derive(Debug, Error)]
pub enum SosieError {
    /// Error from the completion or correction oracle.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the messaging transport.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Memory/storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
