//! Error types and handling
//!
//! All errors are converted to a consistent JSON response format. The tenancy
//! variants are deliberately asymmetric in what they reveal: resolution
//! failures name the problem, membership failures stay generic, and a missing
//! tenant context is reported to the caller as a plain internal error while
//! being logged loudly for operators.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// No organization matches the routing token (404)
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// The resolved organization is suspended (403)
    #[error("Tenant is suspended")]
    TenantSuspended,

    /// The resolved organization is cancelled (410)
    #[error("Tenant is cancelled")]
    TenantCancelled,

    /// Principal is not an active member of the organization (403)
    ///
    /// The payload is for operator logs only; the response body carries a
    /// generic denial so callers cannot distinguish "never invited" from
    /// "suspended membership".
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A tenant-scoped operation ran outside any scoped execution (500)
    ///
    /// A programming error, never a user condition. It must fail the unit of
    /// work; proceeding without a tenant filter is the exact bug class this
    /// subsystem exists to prevent.
    #[error("No tenant context active for this operation")]
    NoTenantContext,

    /// Resource not found (404)
    ///
    /// Also the outcome of any update/delete whose target id belongs to a
    /// different organization; the two cases are indistinguishable by design.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized - authentication required (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict - resource already exists or state conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unprocessable entity - validation failed (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AppError::TenantNotFound(_) => (StatusCode::NOT_FOUND, "tenant_not_found"),
            AppError::TenantSuspended => (StatusCode::FORBIDDEN, "tenant_suspended"),
            AppError::TenantCancelled => (StatusCode::GONE, "tenant_cancelled"),
            AppError::AccessDenied(_) => (StatusCode::FORBIDDEN, "access_denied"),
            AppError::NoTenantContext => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::ValidationError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = match &self {
            // Never reveal the internal reason for a denial.
            AppError::AccessDenied(reason) => {
                warn!(reason = %reason, "Access denied");
                ErrorResponse::new(error_type, "Access denied")
            }
            // A defect, not a user condition: log at error severity and
            // return a generic server error.
            AppError::NoTenantContext => {
                error!("Tenant-scoped operation executed outside a scoped unit of work");
                ErrorResponse::new(error_type, "Internal server error")
            }
            AppError::Database(msg) | AppError::Internal(msg) => {
                error!(error = %msg, error_type = error_type, "Request error");
                ErrorResponse::new(error_type, self.to_string())
            }
            _ => ErrorResponse::new(error_type, self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

// Implement From for common error types

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.message().contains("UNIQUE constraint failed") {
                    AppError::Conflict("Resource already exists".to_string())
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
