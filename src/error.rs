use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::lifecycle::LifecycleError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("missing or malformed identity headers")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("order is already assigned to a courier")]
    AlreadyAssigned,

    #[error("order is not ready for pickup")]
    NotReady,

    #[error("order is in a terminal state")]
    TerminalState,

    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: usize },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { .. } => {
                AppError::InvalidTransition(err.to_string())
            }
            LifecycleError::AlreadyAssigned => AppError::AlreadyAssigned,
            LifecycleError::NotReady => AppError::NotReady,
            LifecycleError::TerminalState => AppError::TerminalState,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::AlreadyAssigned | AppError::NotReady | AppError::TerminalState => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::LocationUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::UploadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::UploadFailed(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::PersistenceFailure(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
