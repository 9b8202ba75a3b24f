//! Error types for borderline-ai
//!
//! Every handler error renders as `{"error": {"code": ..., "message": ...}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Well-formed but semantically invalid payload (422)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Inference endpoint failure (502)
    #[error("Upstream failure: {message}")]
    BadGateway {
        message: String,
        analysis_id: Option<uuid::Uuid>,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Common error: {0}")]
    Common(#[from] borderline_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use borderline_common::Error as CommonError;

        let mut analysis_id = None;
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg)
            }
            ApiError::BadGateway {
                message,
                analysis_id: id,
            } => {
                analysis_id = id;
                (StatusCode::BAD_GATEWAY, "ANALYSIS_FAILED", message)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                CommonError::InvalidState(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    err.to_string(),
                ),
            },
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(id) = analysis_id {
            error["analysis_id"] = json!(id);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<crate::services::PipelineError> for ApiError {
    fn from(err: crate::services::PipelineError) -> Self {
        use crate::services::PipelineError;

        match err {
            PipelineError::Persistence(e) => ApiError::Common(e),
            PipelineError::Inference {
                analysis_id,
                message,
            } => ApiError::BadGateway {
                message,
                analysis_id: Some(analysis_id),
            },
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
