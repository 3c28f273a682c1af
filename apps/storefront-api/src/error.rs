//! # API Error
//!
//! The HTTP boundary: every failure becomes a status code plus
//! `{"code": "<KIND>", "message": "<text>"}`.
//!
//! ```text
//! ValidationError ─┐
//! CoreError ───────┼──► ApiError::kind() ──► ErrorKind ──► StatusCode
//! DbError ─────────┘                                   └─► JSON body
//! ```
//!
//! Internal failures are logged in full and answered with a generic message.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use storefront_core::{CoreError, ErrorKind, ValidationError};
use storefront_db::DbError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token on a route that needs one.
    #[error("Authentication required")]
    Unauthenticated,

    /// A bearer token was sent but could not be accepted.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Authenticated, but not an admin.
    #[error("Admin role required")]
    Forbidden,

    /// Malformed request: body, query, path or multipart field.
    #[error("{0}")]
    BadRequest(String),

    /// A value had the wrong type (e.g. non-numeric id in the path).
    #[error("{0}")]
    TypeNotMatched(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// Writing an upload to disk failed.
    #[error("Upload failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidToken(_) => ErrorKind::Unauthorized,
            ApiError::Forbidden => ErrorKind::Forbidden,
            ApiError::BadRequest(_) => ErrorKind::BadRequest,
            ApiError::TypeNotMatched(_) => ErrorKind::TypeNotMatched,
            ApiError::Validation(e) => e.kind(),
            ApiError::Core(e) => e.kind(),
            ApiError::Db(e) => e.kind(),
            ApiError::Io(_) | ApiError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Message safe to show a client.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InternalServerError => ErrorKind::InternalServerError.message().to_string(),
            _ => self.to_string(),
        }
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::TypeNotMatched => StatusCode::BAD_REQUEST,
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        match kind {
            ErrorKind::InternalServerError => tracing::error!(error = ?self, "Internal error"),
            ErrorKind::Conflict | ErrorKind::AlreadyExists => tracing::warn!(error = %self, "Conflict"),
            ErrorKind::Unauthorized | ErrorKind::Forbidden => tracing::info!(error = %self, "Authorization error"),
            _ => tracing::debug!(error = %self, "Client error"),
        }

        let body = ErrorBody {
            code: kind,
            message: self.user_message(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

// =============================================================================
// Extractor Rejections
// =============================================================================

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::TypeNotMatched(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
