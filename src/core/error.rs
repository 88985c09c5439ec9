//! Typed error handling for the booking service
//!
//! Every failure the service can produce resolves to a [`BookingError`].
//! Each variant carries a human-readable message and maps to one HTTP
//! status code, so handlers can simply propagate with `?` and let the
//! [`IntoResponse`] implementation render the failure envelope.
//!
//! # Error Categories
//!
//! - `BadInput`: malformed, out-of-bounds or missing request parameters (400)
//! - `NotFound`: the target row is absent or soft-deleted (404)
//! - `Conflict`: lock contention on a row another request is mutating (409)
//! - `Storage`, `Notification`, `InvalidLockPlan`, `Internal`: unexpected
//!   failures, reported to clients with a fixed message (500)
//!
//! # Example
//!
//! ```rust,ignore
//! use booking::prelude::*;
//!
//! match workflow.get(42).await {
//!     Ok(booking) => println!("Found: {:?}", booking),
//!     Err(BookingError::NotFound(message)) => println!("{}", message),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned to clients for every 5xx failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Result alias used throughout the crate
pub type Result<T, E = BookingError> = std::result::Result<T, E>;

/// The main error type for the booking service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Malformed, missing or out-of-bounds input
    #[error("{0}")]
    BadInput(String),

    /// Target row does not exist or has been soft-deleted
    #[error("{0}")]
    NotFound(String),

    /// Row-level lock could not be acquired within the lock timeout
    #[error("{0}")]
    Conflict(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Notification sink failure
    #[error("notification error: {0}")]
    Notification(String),

    /// A lock plan that the store cannot honour
    #[error("invalid lock plan: {0}")]
    InvalidLockPlan(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

/// `{code, message}` pair carried by every failure envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code mirrored in the body
    pub code: u16,
    /// Human-readable message
    pub message: String,
}

/// Failure envelope: `{success: false, error: {code, message}}`
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

impl BookingError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        BookingError::BadInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BookingError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BookingError::Conflict(message.into())
    }

    pub fn storage(message: impl std::fmt::Display) -> Self {
        BookingError::Storage(message.to_string())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::BadInput(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Storage(_)
            | BookingError::Notification(_)
            | BookingError::InvalidLockPlan(_)
            | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error, used in structured logs
    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::BadInput(_) => "BAD_INPUT",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::Conflict(_) => "CONFLICT",
            BookingError::Storage(_) => "STORAGE_ERROR",
            BookingError::Notification(_) => "NOTIFICATION_ERROR",
            BookingError::InvalidLockPlan(_) => "INVALID_LOCK_PLAN",
            BookingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Conflict(_))
    }

    /// Convert to the client-facing `{code, message}` pair
    ///
    /// Server-side failures never leak their details.
    pub fn to_body(&self) -> ErrorBody {
        let status = self.status_code();
        let message = if status.is_server_error() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        ErrorBody {
            code: status.as_u16(),
            message,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = Json(ErrorEnvelope {
            success: false,
            error: self.to_body(),
        });
        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|field| field.to_string())
            .unwrap_or_else(|| "input".to_string());
        BookingError::BadInput(format!("{} is invalid", field))
    }
}

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        BookingError::BadInput(format!("invalid parameters: {}", err))
    }
}

impl From<JsonRejection> for BookingError {
    fn from(rejection: JsonRejection) -> Self {
        BookingError::BadInput(rejection.body_text())
    }
}

impl From<QueryRejection> for BookingError {
    fn from(rejection: QueryRejection) -> Self {
        BookingError::BadInput(rejection.body_text())
    }
}

impl From<PathRejection> for BookingError {
    fn from(rejection: PathRejection) -> Self {
        BookingError::BadInput(rejection.body_text())
    }
}
