use crate::inference::PipelineError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types surfaced at the HTTP boundary
#[derive(Error, Debug)]
pub enum AppError {
    /// Artifacts are not loaded
    #[error("Model service not ready")]
    NotReady,

    /// Inference failed for this request
    #[error("Prediction error: {0}")]
    Prediction(#[from] PipelineError),

    /// Request body could not be decoded
    #[error("{0}")]
    InvalidRequest(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::NotReady => "SERVICE_NOT_READY",
            AppError::Prediction(_) => "PREDICTION_ERROR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request rejected"
            );
        }

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

/// Conversion from axum's JSON body rejection
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
