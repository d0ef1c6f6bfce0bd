//! Error types for WebMemory

use thiserror::Error;

/// Result type alias using WebMemory's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for WebMemory
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model provider (chat completions) error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Model provider transiently unavailable (5xx)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// History index unavailable or failing
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Final model output failed the structured answer contract
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::ProviderUnavailable(_)
                | Error::RateLimit(_)
                | Error::Timeout(_)
                | Error::Database(_)
                | Error::Retrieval(_)
        )
    }

    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::Unauthorized(_) | Error::SchemaViolation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::RateLimit("429".into()).is_retryable());
        assert!(Error::ProviderUnavailable("503".into()).is_retryable());
        assert!(Error::Retrieval("index down".into()).is_retryable());
        assert!(!Error::SchemaViolation("missing answer".into()).is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("missing query".into()).is_client_error());
        assert!(Error::SchemaViolation("missing answer".into()).is_client_error());
        assert!(!Error::Provider("boom".into()).is_client_error());
    }
}
