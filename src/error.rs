// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    /// Duplicate email. Reported as 400, not 409, to match the mobile
    /// clients already deployed against the original API.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Mail delivery error: {0}")]
    Mail(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body.
///
/// Every caller-facing failure carries `success: false` plus a stable
/// `error` code and an optional human-readable message.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::IdentityProvider(_)
            | AppError::Storage(_)
            | AppError::Mail(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error, message) = match &self {
            AppError::Unauthorized => ("unauthorized", None),
            AppError::InvalidToken => ("invalid_token", None),
            AppError::NotFound(msg) => ("not_found", Some(msg.clone())),
            AppError::Validation(msg) => ("validation_error", Some(msg.clone())),
            AppError::Conflict(msg) => ("conflict", Some(msg.clone())),
            // Dependency failures: log full context, keep the caller-facing
            // message generic so provider error text never reaches clients.
            AppError::IdentityProvider(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
                ("identity_provider_error", None)
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                ("storage_error", None)
            }
            AppError::Mail(msg) => {
                tracing::error!(error = %msg, "Mail delivery error");
                ("mail_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None)
            }
        };

        let body = ErrorResponse {
            success: false,
            error: error.to_string(),
            message,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::NotFound("user".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("bad email".into()).status(),
            StatusCode::BAD_REQUEST
        );
        // Duplicate email is deliberately 400, not 409
        assert_eq!(
            AppError::Conflict("email taken".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::IdentityProvider("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Mail("bounce".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
