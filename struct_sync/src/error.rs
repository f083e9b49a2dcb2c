//! Error types for StructSync

use thiserror::Error;

/// Result type for StructSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for StructSync
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Parse and configuration errors make the schema data unusable and abort
    /// the whole run. Everything else stays scoped to one destination.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ParseError(_) | Error::ConfigError(_))
    }
}

/// Convert Serde JSON errors to StructSync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to StructSync errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::ParseError("bad line".into()).is_fatal());
        assert!(Error::ConfigError("missing".into()).is_fatal());
        assert!(!Error::ConnectionError("refused".into()).is_fatal());
        assert!(!Error::ExecutionError("duplicate column".into()).is_fatal());
        assert!(!Error::Timeout("SHOW COLUMNS".into()).is_fatal());
    }
}
