//! Structured API error responses with stable error codes.
//!
//! Every domain error maps to a machine-readable code, a numeric code for
//! categorization, and an HTTP status. `Internal` errors stay generic toward
//! the caller and are logged in full.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::infra::LedgerError;

/// Error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic error
/// handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Caller context (1xxx)
    /// No actor context provided by the auth layer
    ActorContextRequired,
    /// Actor context headers are malformed
    InvalidActorContext,

    // Validation (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Field value is invalid (non-positive quantity, malformed identifier)
    InvalidFieldValue,

    // Resource (4xxx)
    /// Product not found
    ProductNotFound,
    /// Ledger entry not found
    EntryNotFound,
    /// Proof artifact not found
    ProofNotFound,

    // Conflict (5xxx)
    /// Uniqueness violation on product code or name
    DuplicateProduct,
    /// Resource still referenced elsewhere
    Conflict,

    // Domain rules (7xxx)
    /// Exit exceeds available stock
    InsufficientStock,

    // Infrastructure (8xxx)
    /// Internal server error
    InternalError,

    // Anchoring (9xxx)
    /// Timestamp authority unreachable
    AnchorUnavailable,
    /// Entry committed but not yet anchored
    AnchorPending,
}

impl ErrorCode {
    /// Numeric code for easy categorization
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::ActorContextRequired => 1001,
            ErrorCode::InvalidActorContext => 1002,

            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::InvalidFieldValue => 3002,

            ErrorCode::ProductNotFound => 4001,
            ErrorCode::EntryNotFound => 4002,
            ErrorCode::ProofNotFound => 4003,

            ErrorCode::DuplicateProduct => 5001,
            ErrorCode::Conflict => 5002,

            ErrorCode::InsufficientStock => 7001,

            ErrorCode::InternalError => 8999,

            ErrorCode::AnchorUnavailable => 9001,
            ErrorCode::AnchorPending => 9002,
        }
    }

    /// HTTP status for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ActorContextRequired => StatusCode::UNAUTHORIZED,
            ErrorCode::InvalidActorContext => StatusCode::UNAUTHORIZED,

            ErrorCode::InvalidRequestBody => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,

            ErrorCode::ProductNotFound => StatusCode::NOT_FOUND,
            ErrorCode::EntryNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ProofNotFound => StatusCode::NOT_FOUND,

            ErrorCode::DuplicateProduct => StatusCode::CONFLICT,
            ErrorCode::Conflict => StatusCode::CONFLICT,

            ErrorCode::InsufficientStock => StatusCode::CONFLICT,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorCode::AnchorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::AnchorPending => StatusCode::NOT_FOUND,
        }
    }
}

/// Structured error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

/// Detailed error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Numeric error code
    pub numeric_code: u32,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.error.code.http_status(), Json(self)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match &e {
            LedgerError::ProductNotFound(_) => ApiError::new(ErrorCode::ProductNotFound, e.to_string()),
            LedgerError::EntryNotFound(_) => ApiError::new(ErrorCode::EntryNotFound, e.to_string()),
            LedgerError::ProofNotFound(_) => ApiError::new(ErrorCode::ProofNotFound, e.to_string()),
            LedgerError::AnchorPending(_) => ApiError::new(ErrorCode::AnchorPending, e.to_string()),
            LedgerError::InvalidQuantity(_) | LedgerError::InvalidArgument(_) => {
                ApiError::new(ErrorCode::InvalidFieldValue, e.to_string())
            }
            LedgerError::InsufficientStock {
                product_id,
                requested,
                available,
            } => ApiError::new(ErrorCode::InsufficientStock, e.to_string()).with_details(
                serde_json::json!({
                    "product_id": product_id,
                    "requested": requested,
                    "available": available,
                }),
            ),
            LedgerError::Conflict(_) => ApiError::new(ErrorCode::DuplicateProduct, e.to_string()),
            LedgerError::AnchorUnavailable(_) => {
                ApiError::new(ErrorCode::AnchorUnavailable, e.to_string())
            }
            LedgerError::Database(_) | LedgerError::Internal(_) => {
                error!(error = %e, "internal error");
                ApiError::new(ErrorCode::InternalError, "internal server error")
            }
        }
    }
}
