//! Error types for the SEO content and internal linking engine.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for engine operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache backend error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Relational store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Template expansion left the output in an invalid state
    #[error("Template error: {0}")]
    Template(String),

    /// A rotation table was used with no candidates
    #[error("Rotation table '{0}' is empty")]
    EmptyRotationTable(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cleanup would delete raw rows that were never aggregated
    #[error("Retention guard: {0}")]
    RetentionGuard(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Cache(err.to_string())
    }
}

impl Error {
    /// HTTP status code used when the error reaches the API surface
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::RetentionGuard(_) => 409,
            Error::Cache(_) | Error::Storage(_) => 503,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EmptyRotationTable("verbs".to_string());
        assert_eq!(err.to_string(), "Rotation table 'verbs' is empty");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(Error::RetentionGuard("x".into()).status_code(), 409);
        assert_eq!(Error::Storage("x".into()).status_code(), 503);
        assert_eq!(Error::Template("x".into()).status_code(), 500);
    }
}
