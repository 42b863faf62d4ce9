//! API error taxonomy.
//!
//! Only infrastructure-level faults surface as HTTP error statuses.
//! Expected domain outcomes (wrong price, already claimed, referrer not
//! found while registering) are structured response payloads handled by
//! the endpoint modules, never errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::storage::repository::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller identity missing or unusable. Never retried automatically.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Caller is not entitled to act on the target entity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Malformed or out-of-domain input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Transient dependency failure; the caller should retry. Entity
    /// state is left unchanged.
    #[error("temporarily unavailable: {0}")]
    Unavailable(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied(_) => "permission_denied",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.kind(), message: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Backend(msg) => Self::Unavailable(msg),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Unavailable(err.to_string())
    }
}
