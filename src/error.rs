//! Unified error handling for the gist registry.
//!
//! This module provides a centralized error type (`AppError`) that handles
//! all errors throughout the application and maps them to appropriate HTTP responses.
//! Workflow errors (`PublishError`, `LookupError`) convert into it so handlers
//! can use `?` throughout.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::gist::GistError;
use crate::services::github::GithubError;
use crate::services::package::StoreError;
use crate::services::registry::{LookupError, PublishError};

/// Unified application error type.
///
/// All errors in the application are converted to this type, which implements
/// `actix_web::ResponseError` for automatic HTTP response generation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database errors from SQLx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// GitHub OAuth errors
    #[error("GitHub error: {0}")]
    GitHub(#[from] GithubError),

    /// Gist API errors
    #[error("Gist error: {0}")]
    Gist(#[from] GistError),

    /// Token-related errors (signing, decoding)
    #[error("Token error: {0}")]
    Token(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not the owner of the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Conflict(_) => AppError::Conflict("Version is a duplicate".to_string()),
            StoreError::OutOfOrder(_) => {
                AppError::BadRequest("Version is less than latest".to_string())
            }
            StoreError::PackageMissing(_) => {
                AppError::NotFound("Package does not exist".to_string())
            }
            StoreError::GistMismatch { .. } => AppError::Conflict(
                "Package was published concurrently, retry the publish".to_string(),
            ),
        }
    }
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::InvalidVersion(_) => {
                AppError::BadRequest("Invalid version number".to_string())
            }
            PublishError::PackageNotFound => {
                AppError::NotFound("Package does not exist".to_string())
            }
            PublishError::Duplicate => AppError::Conflict("Version is a duplicate".to_string()),
            PublishError::NotGreatest => {
                AppError::BadRequest("Version is less than latest".to_string())
            }
            PublishError::Gist(e) => AppError::Gist(e),
            PublishError::Store(e) => e.into(),
        }
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::PackageNotFound
            | LookupError::VersionNotFound
            | LookupError::FileNotFound => AppError::NotFound(err.to_string()),
            LookupError::Gist(e) => AppError::Gist(e),
            LookupError::Store(e) => e.into(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::GitHub(_) => StatusCode::BAD_GATEWAY,
            AppError::Gist(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_message = match self {
            // For database and internal errors, don't expose internal details
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Token(_) => "Token processing error".to_string(),
            // For these errors, expose the message
            AppError::GitHub(e) => format!("GitHub authentication error: {}", e),
            AppError::Gist(e) => e.to_string(),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
        };

        let body = serde_json::json!({
            "error": error_message
        });

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
