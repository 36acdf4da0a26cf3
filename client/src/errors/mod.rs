//! Client-wide error types.
//!
//! Every component boundary converts failures into a [`ClientError`]; the
//! presentation layer folds them further into an [`OperationResult`].

use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Fixed message shown whenever no response was received.
pub const SERVER_UNREACHABLE: &str = "Unable to connect to server";

/// Failure taxonomy shared by every component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Empty or duplicate input, caught before any network call.
    #[error("{message}")]
    Validation { message: String },

    /// Missing, invalid or expired bearer token.
    #[error("{message}")]
    Auth { message: String },

    /// No response was received (connection refused, timeout, ...).
    #[error("Unable to connect to server")]
    Transport { detail: String },

    /// The server answered with a non-success status.
    #[error("{message}")]
    Remote { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn not_authenticated() -> Self {
        Self::auth("Not signed in")
    }

    /// Machine-readable category name.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation { .. } => "validation_error",
            ClientError::Auth { .. } => "auth_error",
            ClientError::Transport { .. } => "transport_error",
            ClientError::Remote { .. } => "remote_error",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth { .. })
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(validation_errors: ValidationErrors) -> Self {
        let mut error_messages: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();
        // field_errors() is a HashMap; keep the message stable
        error_messages.sort();

        ClientError::validation(error_messages.join(", "))
    }
}

/// Result value handed to the presentation layer: an explicit success flag
/// plus a single human-readable message on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            error_type: None,
        }
    }

    pub fn failed(error: &ClientError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            error_type: Some(error.kind()),
        }
    }
}

impl<T> From<&ClientResult<T>> for OperationResult {
    fn from(result: &ClientResult<T>) -> Self {
        match result {
            Ok(_) => OperationResult::ok(),
            Err(error) => OperationResult::failed(error),
        }
    }
}
