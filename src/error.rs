//! Error types for each layer of the service.

use actix_web::{
    error::BlockingError,
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use serde_json::json;
use thiserror::Error;

/// Rejection of caller-supplied data before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Structural or range check failed; the caller must correct the input.
    #[error("{0}")]
    InvalidInput(String),

    /// A referenced record does not exist.
    #[error("{0}")]
    ReferenceNotFound(String),
}

impl ValidationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationError::InvalidInput(message.into())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The circuit breaker is open and calls are being rejected.
    #[error("database is not accepting calls")]
    Unavailable,

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// A unique key already holds this value.
    #[error("{0}")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
#[error("credential error: {0}")]
pub struct CredentialError(pub String);

/// Everything a handler can fail with, mapped to a status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{0}")]
    Internal(String),

    #[error("blocking task failed")]
    Blocking,
}

impl From<BlockingError> for ApiError {
    fn from(_: BlockingError) -> Self {
        ApiError::Blocking
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Unknown food references answer 400 like the existing client expects.
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Store(StoreError::Duplicate(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Store(StoreError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(_)
            | ApiError::Credential(_)
            | ApiError::Internal(_)
            | ApiError::Blocking => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("request failed: {self}");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "service temporarily unavailable".to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(json!({ "message": message }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests() {
        let missing = ApiError::from(ValidationError::ReferenceNotFound("no food".into()));
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

        let invalid = ApiError::from(ValidationError::invalid("bad grams"));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "bad grams");
    }

    #[test]
    fn open_breaker_maps_to_service_unavailable() {
        let err = ApiError::from(StoreError::Unavailable);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn duplicate_keys_are_conflicts() {
        let err = ApiError::from(StoreError::Duplicate("email taken".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "email taken");
    }

    #[test]
    fn corrupt_rows_are_internal_errors() {
        let err = ApiError::from(StoreError::CorruptRow("meal_type 9".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
