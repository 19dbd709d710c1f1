//! HTTP-facing error type for the REST handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::media_stream::markup::MarkupError;

/// Result type for HTTP handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Errors returned to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required request field was absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The call identifier cannot be embedded in a stream URL
    #[error("Invalid call identifier: {0}")]
    InvalidCallId(String),

    /// The answer markup could not be rendered
    #[error(transparent)]
    Markup(#[from] MarkupError),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidCallId(_) => StatusCode::BAD_REQUEST,
            Self::Markup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({"error": self.to_string()}))).into_response()
    }
}
