//! Error types for the Pitlane assistant.
//!
//! This module defines a unified error enum covering every error category in
//! the workspace: request validation, readiness, knowledge-source sync,
//! embedding/generation providers, configuration and prompt handling.
//!
//! Each variant maps onto the status code an outer transport layer should
//! answer with, see [`AppError::status_code`].

use serde::Serialize;
use thiserror::Error;

/// Unified error type for the Pitlane assistant.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed request field
    #[error("Validation error: {0}")]
    Validation(String),

    /// No knowledge snapshot has been loaded yet
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Fetch or parse failure of the knowledge or instruction source
    #[error("Source sync error: {0}")]
    SourceSync(String),

    /// Embedding or generation provider failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Maintenance credential missing or wrong
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Status code an outer HTTP layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::NotReady(_) => 503,
            _ => 500,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Server-side failures are reported generically; the detail goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized(_) => "Unauthorized".to_string(),
            AppError::NotReady(_) => {
                "The assistant is still loading its knowledge. Please try again shortly."
                    .to_string()
            }
            _ => "Something went wrong while answering. Please try again.".to_string(),
        }
    }

    /// Build the `{error}` response body for this error.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.public_message(),
        }
    }
}

/// Error response body: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
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
