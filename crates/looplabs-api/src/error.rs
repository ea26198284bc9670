//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use looplabs_engine::EngineError;
use looplabs_models::ErrorBody;
use thiserror::Error;

use crate::config::is_production_env;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Render error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Engine(_) | ApiError::Io(_) | ApiError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text placed in the `error` field of the response body.
    fn detail(&self, production: bool) -> String {
        match self {
            // The engine's own diagnostics are always surfaced
            ApiError::Engine(e) => e.diagnostic(),
            ApiError::Internal(_) | ApiError::Io(_) | ApiError::Json(_) => {
                // Don't expose internal error details in production
                if production {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let production = std::env::var("ENVIRONMENT")
            .map(|v| is_production_env(&v))
            .unwrap_or(false);
        (self.status_code(), Json(ErrorBody::new(self.detail(production)))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Engine(EngineError::Timeout(5)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_engine_failure_detail_is_stderr() {
        let err = ApiError::from(EngineError::RenderFailed {
            stderr: "ModuleNotFoundError: moviepy".to_string(),
            stdout: String::new(),
            exit_code: Some(1),
        });
        assert_eq!(err.detail(false), "ModuleNotFoundError: moviepy");
        assert_eq!(err.detail(true), "ModuleNotFoundError: moviepy");
    }

    #[test]
    fn test_internal_detail_hidden_in_production() {
        let err = ApiError::internal("db password is hunter2");
        assert_eq!(err.detail(true), "An internal error occurred");
        assert_eq!(err.detail(false), "Internal error: db password is hunter2");

        let err = ApiError::bad_request("missing prompt");
        assert_eq!(err.detail(true), "Bad request: missing prompt");
    }
}
