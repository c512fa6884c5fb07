//! # API Error Types
//!
//! Every failure leaves the service as `{ "success": false, "error": "..." }`
//! with status 400. A failed verification is not an error and never comes
//! through here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// Error response body shared by all endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// The request was well formed but its content was rejected.
    #[error("{0}")]
    Validation(String),

    /// The session has no tree yet.
    #[error("{0}")]
    NoTree(String),

    /// The body could not be parsed.
    #[error("malformed request: {0}")]
    BadRequest(String),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        if err.is_state() {
            AppError::NoTree(err.to_string())
        } else {
            AppError::Validation(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request rejected");
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
