use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rota_core::error::{Error, ErrorResponse};

/// Internal error type that renders the wire envelope
/// `{success: false, message}` with the matching status code.
#[derive(Debug)]
pub enum AppError {
    /// A domain failure from the core taxonomy.
    Domain(Error),
    /// Database error (500 unless recognised at the call site).
    Database(sqlx::Error),
    /// Internal error (500).
    Internal(String),
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AppError::Domain(Error::InvalidInput(message.into()))
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AppError::Domain(Error::NotAuthenticated(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Domain(Error::Forbidden(message.into()))
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::Domain(Error::NotFound(resource.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Domain(Error::Conflict(message.into()))
    }
}

/// Postgres unique-constraint violation (duplicate email and friends).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Domain(err) => {
                let status = match &err {
                    Error::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
                    Error::Forbidden(_) => StatusCode::FORBIDDEN,
                    Error::InvalidInput(_) | Error::NoAgents => StatusCode::BAD_REQUEST,
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::Conflict(_) => StatusCode::CONFLICT,
                    Error::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Unexpected error: {err}");
                    (status, "An internal error occurred".to_string())
                } else {
                    (status, err.to_string())
                }
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Domain(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}
