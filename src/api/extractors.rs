//! # Custom Extractors
//!
//! JSON body extraction mapped onto [`AppError`] and the caller's session.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Json;
use std::convert::Infallible;

use crate::api::error::AppError;
use crate::store::SessionId;

/// Header naming the caller's session
pub const SESSION_HEADER: &str = "x-session-id";

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Session taken from the `x-session-id` header, `default` when absent.
#[derive(Debug, Clone)]
pub struct Session(pub SessionId);

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(SessionId::new)
            .unwrap_or_default();
        Ok(Session(session))
    }
}
