use serde::Serialize;
use utoipa::ToSchema;

/// Domain error taxonomy. Every operation surfaces one of these; the HTTP
/// layer maps them to status codes and the wire envelope.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No principal, or the principal's credentials did not check out (401).
    #[error("{0}")]
    NotAuthenticated(String),
    /// Authenticated but not allowed to perform the operation (403).
    #[error("{0}")]
    Forbidden(String),
    /// Missing or malformed caller input (400).
    #[error("{0}")]
    InvalidInput(String),
    /// An id lookup came up empty (404).
    #[error("{0} not found")]
    NotFound(String),
    /// Duplicate email or similar uniqueness clash (409).
    #[error("{0}")]
    Conflict(String),
    /// Distribution requested with an empty agent scope (400).
    #[error("No agents found to distribute lists")]
    NoAgents,
    /// Store or hash failure (500). The message is logged, never sent.
    #[error("{0}")]
    Unexpected(String),
}

impl Error {
    pub fn not_authenticated() -> Self {
        Error::NotAuthenticated("Not authenticated".to_string())
    }
}

/// Failure envelope sent on every error response: `{success: false, message}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Human-readable description of what went wrong
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            success: false,
            message: message.into(),
        }
    }
}
