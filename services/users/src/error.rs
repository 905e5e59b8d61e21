//! Error type for the users service HTTP boundary

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Every way a mutation request can end short of success.
///
/// Bodies are short plain-text messages; the status code carries the
/// category. Underlying causes are logged where the error is raised and are
/// never echoed to the caller.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed body, invalid field value, missing file or upload failure
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing, malformed, undecodable or revoked token
    #[error("Unauthorized")]
    Unauthorized,

    /// Permission denied or permission could not be evaluated
    #[error("Forbidden")]
    Forbidden,

    /// Any verb other than the one the endpoint accepts
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Uploaded bytes are not one of the accepted image formats
    #[error("Unsupported media type")]
    UnsupportedMediaType,

    /// A dependency failed (filesystem, database, cache)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Invalid request method".to_string(),
            ),
            ApiError::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Invalid file format".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, message).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
