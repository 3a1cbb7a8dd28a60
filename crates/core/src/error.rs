//! Error types for Docent.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, generation, knowledge, prompt,
//! storage and request validation errors.

use thiserror::Error;

/// Unified error type for Docent.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Generation failures (`Config`, `Llm`) are converted into visible answer
/// text by the chat controller and never escape an `ask` call.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors, including an unreachable or
    /// unauthenticated generation provider
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation provider errors (transport, malformed or empty output, timeout)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document catalog and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Session/turn store errors
    #[error("Store error: {0}")]
    Store(String),

    /// A referenced session, turn or scope does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to act on the requested scope
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request itself is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error originates in the generation layer.
    ///
    /// These are the errors the chat controller turns into an error-text
    /// answer instead of propagating.
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Llm(_))
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
