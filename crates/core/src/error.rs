//! Error types for Promptsmith.
//!
//! One enum covers every failure category in the workspace. The provider
//! layer raises `Connectivity` and `Generation`; the orchestrators in
//! `promptsmith-prompt` catch those and turn them into data, so only
//! `Storage` failures escape a test or improve run.

use thiserror::Error;

/// Unified error type for Promptsmith.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed input: unknown framework code, missing required field, bad template
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller does not own the record, or the record is system-owned
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// Record lookup by id failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection references a provider that is not registered
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// Backend unreachable, non-200 response, or timeout.
    ///
    /// The message is the provider's last recorded error, already prefixed.
    #[error("{0}")]
    Connectivity(String),

    /// Backend reachable but the generation call failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_prefix() {
        let err = AppError::Generation("connection reset".to_string());
        assert_eq!(err.to_string(), "Generation error: connection reset");
    }

    #[test]
    fn test_connectivity_error_is_verbatim() {
        let err = AppError::Connectivity("Missing required configuration field: model".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration field: model"
        );
    }

    #[test]
    fn test_provider_not_found_display() {
        let err = AppError::ProviderNotFound("mystery".to_string());
        assert_eq!(err.to_string(), "Provider not found: mystery");
    }
}
