//! Request handlers.
//!
//! Handlers parse and validate input, enforce role checks, and map
//! store/orchestrator results onto the external protocol. Errors leave
//! the process as `{error, request_id?}` JSON bodies.

pub mod auth;
pub mod health;
pub mod invites;
pub mod logs;
pub mod registry;
pub mod services;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use maxcloud_core::Error;
use serde::Serialize;
use tracing::error;

use crate::middleware::RequestId;

/// JSON error body of every failure response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

/// A handler failure carrying its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            request_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(request_id: &RequestId) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            .with_request_id(request_id)
    }

    pub fn with_request_id(mut self, request_id: &RequestId) -> Self {
        self.request_id = Some(request_id.0.clone());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            request_id: self.request_id,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Map a store error onto its HTTP representation. Unknown errors are
/// logged with the request id and surfaced as 500.
pub(crate) fn store_error(err: Error, request_id: &RequestId) -> ApiError {
    match err {
        Error::NotFound => ApiError::not_found("not found"),
        Error::KeyNotFound => ApiError::not_found("api key not found"),
        Error::InviteNotFound => ApiError::not_found("invite not found"),
        Error::InviteExpired => ApiError::new(StatusCode::GONE, "invite expired"),
        Error::DuplicateService => ApiError::new(
            StatusCode::CONFLICT,
            "service with this name already exists",
        ),
        Error::DuplicateEmail => {
            ApiError::new(StatusCode::CONFLICT, "email already registered")
        }
        Error::DuplicateOrg => {
            ApiError::new(StatusCode::CONFLICT, "organization name already taken")
        }
        Error::AlreadyMember => ApiError::new(
            StatusCode::CONFLICT,
            "user is already a member of this organization",
        ),
        Error::Database(_) | Error::Internal(_) => {
            error!(error = %err, request_id = %request_id.0, "store operation failed");
            ApiError::internal(request_id)
        }
    }
}
