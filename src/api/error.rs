//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use uuid::Uuid;

use crate::service::TriageError;

/// Standard error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Missing or invalid credential (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Credential valid but the caller lacks access (403)
    #[error("Finding not found or access denied: {0}")]
    AccessDenied(String),

    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Finding not found (404)
    #[error("Finding not found: {0}")]
    NotFound(String),

    /// Hourly quota or upstream model rate limit (429)
    #[error("{0}")]
    RateLimited(String),

    /// Upstream model billing exhausted (402)
    #[error("Model credits exhausted")]
    CreditsExhausted,

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::CreditsExhausted => StatusCode::PAYMENT_REQUIRED,
            ApiError::Internal(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::AccessDenied(_) => "access_denied",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::RateLimited(_) => "rate_limit_exceeded",
            ApiError::CreditsExhausted => "credits_exhausted",
            ApiError::Internal(_) => "internal_error",
            ApiError::Database(_) => "database_error",
        };

        tracing::error!(
            error_type = error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
        })
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::Unauthorized => ApiError::Unauthorized,
            TriageError::AccessDenied(id) => ApiError::AccessDenied(id.to_string()),
            TriageError::Validation(msg) => ApiError::BadRequest(msg),
            TriageError::NotFound(id) => ApiError::NotFound(id.to_string()),
            TriageError::RateLimited(msg) => ApiError::RateLimited(msg),
            TriageError::CreditsExhausted => ApiError::CreditsExhausted,
            // Store details stay in the logs, not the response body
            TriageError::Store(e) => ApiError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_taxonomy() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::AccessDenied("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::RateLimited("x".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::CreditsExhausted.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn triage_errors_map_to_api_errors() {
        let err: ApiError = TriageError::Unauthorized.into();
        assert!(matches!(err, ApiError::Unauthorized));

        let err: ApiError = TriageError::RateLimited("quota".into()).into();
        assert!(matches!(err, ApiError::RateLimited(_)));

        let err: ApiError = TriageError::CreditsExhausted.into();
        assert!(matches!(err, ApiError::CreditsExhausted));
    }
}
