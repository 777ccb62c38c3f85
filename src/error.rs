//! Error handling for the inventory server
//!
//! Handlers return `Result<_, AppError>`. Each variant maps to one HTTP status
//! and renders as `{"error": "..."}`. Database and internal failures are
//! logged with their cause and answered with a generic message.

use thiserror::Error;

/// Main error type for API handlers and services
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Exclusive login is held by another user
    #[error("{0}")]
    Locked(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "server")]
mod response {
    use axum::extract::rejection::JsonRejection;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use stockroom_types::ErrorBody;

    use super::AppError;

    /// Malformed or mistyped request bodies are client errors
    impl From<JsonRejection> for AppError {
        fn from(rejection: JsonRejection) -> Self {
            AppError::BadRequest(rejection.body_text())
        }
    }

    impl AppError {
        pub fn status(&self) -> StatusCode {
            match self {
                AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
                AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                AppError::Forbidden(_) => StatusCode::FORBIDDEN,
                AppError::NotFound(_) => StatusCode::NOT_FOUND,
                AppError::Conflict(_) => StatusCode::CONFLICT,
                AppError::Locked(_) => StatusCode::LOCKED,
                AppError::Database(_) | AppError::Export(_) | AppError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status();
            let error = match &self {
                AppError::Database(e) => {
                    tracing::error!("Database error: {}", e);
                    "Database error".to_string()
                }
                AppError::Internal(e) => {
                    tracing::error!("Internal error: {:#}", e);
                    "Internal server error".to_string()
                }
                AppError::Export(e) => {
                    tracing::error!("Export failed: {}", e);
                    format!("Export failed: {}", e)
                }
                other => other.to_string(),
            };
            (status, Json(ErrorBody { error })).into_response()
        }
    }
}
