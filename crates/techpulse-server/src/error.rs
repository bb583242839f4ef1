//! The JSON error body contract for the HTTP surface (§7): a 429 from an
//! upstream adapter never reaches a caller as an error — callers only see
//! partial results with a 200. Everything else that can go wrong inside
//! the server maps to a 4xx/5xx JSON body here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] techpulse_core::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Core(techpulse_core::Error::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Core(techpulse_core::Error::InvalidRecord(_)) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Core(_) | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorBody {
            error: code.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
