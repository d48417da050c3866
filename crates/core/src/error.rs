//! Error types for askboard.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! provider, storage, validation and moderation failures.

use thiserror::Error;

/// Unified error type for askboard.
///
/// All fallible functions return `Result<T, AppError>`.
/// Provider errors (`Llm`, `Embedding`) are normally recovered inside the
/// adapters; the remaining variants are surfaced to callers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language-model provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index and conversation log errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Malformed input rejected before any write
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Approval requested without an override answer or a draft
    #[error("Nothing to approve for log entry {0}")]
    NothingToApprove(u64),

    /// Moderation attempted on an entry that is not pending
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// True for errors a caller should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::NothingToApprove(_)
                | AppError::InvalidTransition(_)
        )
    }
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
    fn test_client_error_classification() {
        assert!(AppError::Validation("empty".into()).is_client_error());
        assert!(AppError::NothingToApprove(3).is_client_error());
        assert!(AppError::NotFound("log 9".into()).is_not_found());
        assert!(!AppError::Llm("timeout".into()).is_client_error());
    }

    #[test]
    fn test_nothing_to_approve_message() {
        let err = AppError::NothingToApprove(42);
        assert_eq!(err.to_string(), "Nothing to approve for log entry 42");
    }
}
