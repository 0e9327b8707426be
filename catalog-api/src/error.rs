//! Axum-facing error type (spec §6, §7), modeled on
//! `ferrex-server::errors::AppError` but with the response body shape
//! spec §6 pins down explicitly: `{"detail": "<message>"}` rather than
//! the teacher's nested `{"error": {...}}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use catalog_core::error::CatalogError;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self { status: StatusCode::UNPROCESSABLE_ENTITY, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

/// Translates the component-level error taxonomy (spec §7) onto HTTP:
/// `Invalid` is a client error (never retried, never cached as a
/// "miss"), `NotFound` should already have been intercepted upstream as
/// an "absent" `Option`, but is mapped defensively in case a service
/// surfaces it directly. Everything else is an opaque 500 so the client
/// never sees an internal backend message.
impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Invalid(msg) => Self::unprocessable(msg),
            CatalogError::NotFound(msg) => Self::not_found(msg),
            other => Self::internal(other.to_string()),
        }
    }
}
