use thiserror::Error;

/// Top-level error type for the Mr. French system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for FrenchError` so that the `?` operator works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("History error: {0}")]
    History(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for FrenchError {
    fn from(err: toml::de::Error) -> Self {
        FrenchError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FrenchError {
    fn from(err: toml::ser::Error) -> Self {
        FrenchError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FrenchError {
    fn from(err: serde_json::Error) -> Self {
        FrenchError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Mr. French operations.
pub type Result<T> = std::result::Result<T, FrenchError>;
