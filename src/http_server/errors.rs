//! # API Errors
//!
//! HTTP-facing error type mapping engine outcomes onto the wire protocol.
//! Every error renders as `{"error": ..., "description": ...}` except
//! `Gone`, whose contract is a bare `{}` body with status 410.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong Basic credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// The client did not pass `accepts_incomplete=true` on an operation
    /// that only runs asynchronously
    #[error("This broker only supports asynchronous operations; pass accepts_incomplete=true")]
    AsyncRequired,

    /// A query parameter failed to parse
    #[error("Invalid query parameter: {0}")]
    InvalidQueryParam(String),

    /// Engine outcome, mapped to a status by `status_code`
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AsyncRequired => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidQueryParam(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::Conflict(_) => StatusCode::CONFLICT,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Gone => StatusCode::GONE,
                EngineError::Broker(_) | EngineError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Short machine-readable label for the response body
    fn label(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "Unauthorized",
            ApiError::AsyncRequired => "AsyncRequired",
            ApiError::InvalidQueryParam(_) => "InvalidQueryParam",
            ApiError::Engine(e) => match e {
                EngineError::Validation(_) => "InvalidRequest",
                EngineError::Conflict(_) => "Conflict",
                EngineError::NotFound(_) => "NotFound",
                EngineError::Gone => "Gone",
                EngineError::Broker(_) | EngineError::Store(_) => "InternalError",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::GONE {
            return (status, Json(json!({}))).into_response();
        }
        let body = json!({
            "error": self.label(),
            "description": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::AsyncRequired.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(EngineError::Validation("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(EngineError::Conflict("busy".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(EngineError::Gone).status_code(),
            StatusCode::GONE
        );
    }

    #[test]
    fn test_gone_renders_empty_object() {
        let response = ApiError::from(EngineError::Gone).into_response();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ApiError::AsyncRequired.label(), "AsyncRequired");
        assert_eq!(
            ApiError::from(EngineError::Conflict("busy".into())).label(),
            "Conflict"
        );
    }
}
