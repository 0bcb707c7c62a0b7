//! Error types for quickpoll.

use serde::Serialize;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Every failure a caller can observe maps to exactly one variant. Client
/// variants are raised before any write is attempted; server variants are
/// raised while talking to the store and always follow a rollback.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid vote: {0}")]
    InvalidVote(String),

    #[error("The provided modification code is invalid or does not match the poll")]
    InvalidCapability,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Update not allowed: {0}")]
    UpdateNotAllowed(String),

    #[error(
        "An option with the text '{0}' already exists or is being added in this update"
    )]
    DuplicateOptionText(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Server Errors ===
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable error body handed to transport layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable tag.
    pub code: &'static str,
    /// Human-readable message, free of storage detail.
    pub message: String,
}

impl AppError {
    /// Returns the stable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidVote(_) => "INVALID_VOTE",
            Self::InvalidCapability => "INVALID_MODIFICATION_CODE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::UpdateNotAllowed(_) => "POLL_UPDATE_NOT_ALLOWED",
            Self::DuplicateOptionText(_) => "DUPLICATE_OPTION_TEXT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error originates on the server side.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Config(_) | Self::Internal(_)
        )
    }

    /// Message safe to show to a caller.
    ///
    /// Server errors carry driver or storage text in their payload, which is
    /// replaced by a generic message here.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Persistence(_) => "The operation could not be stored. No changes were made.".to_string(),
            Self::Config(_) | Self::Internal(_) => "An unexpected error occurred.".to_string(),
            _ => self.to_string(),
        }
    }

    /// Build the serializable body for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.error_code(),
            message: self.client_message(),
        }
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
