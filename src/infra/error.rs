//! Error types for the stock ledger.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the ledger store, anchor client and processor.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Product not found
    #[error("product not found: {0}")]
    ProductNotFound(Uuid),

    /// Ledger entry not found
    #[error("ledger entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Proof artifact not found (missing handle target or deleted file)
    #[error("proof artifact not found: {0}")]
    ProofNotFound(String),

    /// Entry exists but no proof has been anchored yet
    #[error("anchor pending for entry {0}")]
    AnchorPending(Uuid),

    /// Non-positive movement quantity
    #[error("invalid quantity: {0} (must be positive)")]
    InvalidQuantity(i64),

    /// Malformed identifier or argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Exit exceeds the available balance (domain rule, not a bug)
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: Uuid,
        requested: i64,
        available: i64,
    },

    /// Uniqueness violation on product code or name
    #[error("conflict: {0}")]
    Conflict(String),

    /// External timestamping authority unreachable or failing
    #[error("timestamp authority unavailable: {0}")]
    AnchorUnavailable(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Whether a retry might succeed (used by the anchor retry policy).
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::AnchorUnavailable(_))
    }

    /// Stable machine-readable kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Database(_) => "internal",
            LedgerError::ProductNotFound(_) => "not_found",
            LedgerError::EntryNotFound(_) => "not_found",
            LedgerError::ProofNotFound(_) => "not_found",
            LedgerError::AnchorPending(_) => "anchor_pending",
            LedgerError::InvalidQuantity(_) => "invalid_argument",
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::InsufficientStock { .. } => "insufficient_stock",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::AnchorUnavailable(_) => "anchor_unavailable",
            LedgerError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Internal(e.to_string())
    }
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_anchor_unavailable_is_transient() {
        assert!(LedgerError::AnchorUnavailable("timeout".into()).is_transient());
        assert!(!LedgerError::ProductNotFound(Uuid::new_v4()).is_transient());
        assert!(!LedgerError::InsufficientStock {
            product_id: Uuid::new_v4(),
            requested: 6,
            available: 4,
        }
        .is_transient());
    }

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(LedgerError::EntryNotFound(Uuid::new_v4()).kind(), "not_found");
        assert_eq!(LedgerError::InvalidQuantity(0).kind(), "invalid_argument");
        assert_eq!(
            LedgerError::Conflict("duplicate code".into()).kind(),
            "conflict"
        );
    }
}
