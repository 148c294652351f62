//! Trait definitions for the stock ledger core services.

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::crypto::Hash256;
use crate::domain::{
    ActorId, AppliedMovement, EntryId, LedgerEntry, MovementRecord, NewProduct, Product,
    ProductFilter, ProductId, ProductUpdate,
};

use super::Result;

/// Owns per-product stock state and the append-only movement ledger.
///
/// Invariants:
/// - `current_stock >= 0` for every product, at all times.
/// - Stock mutation and ledger append for one movement are a single unit of
///   work: either both are observed or neither is.
/// - Conflicting mutations on the same product serialize; mutations on
///   different products proceed concurrently.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create a product; fails with `Conflict` on duplicate code or name.
    async fn create_product(&self, new_product: NewProduct) -> Result<Product>;

    async fn product_by_id(&self, product_id: ProductId) -> Result<Option<Product>>;

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>>;

    /// Administrative update of catalog fields and/or the stock balance.
    /// `current_stock` and `add_stock` are mutually exclusive.
    async fn update_product(&self, product_id: ProductId, update: ProductUpdate)
        -> Result<Product>;

    /// Returns whether a product existed. Fails with `Conflict` when ledger
    /// entries still reference it.
    async fn delete_product(&self, product_id: ProductId) -> Result<bool>;

    /// Increase stock and append the entry row atomically.
    async fn apply_entry(&self, record: MovementRecord) -> Result<AppliedMovement>;

    /// Check sufficiency, decrease stock and append the exit row atomically.
    /// The sufficiency check and the decrement are one read-modify-write on
    /// the locked product row; a stale read can never drive stock negative.
    async fn apply_exit(&self, record: MovementRecord) -> Result<AppliedMovement>;

    /// Attach the anchor proof handle to a committed entry. The only
    /// permitted post-creation mutation of a ledger row.
    async fn attach_proof(&self, entry_id: EntryId, proof_reference: &str) -> Result<()>;

    async fn entry_by_id(&self, entry_id: EntryId) -> Result<Option<LedgerEntry>>;

    /// All entries in commit order.
    async fn list_entries(&self) -> Result<Vec<LedgerEntry>>;

    async fn entries_by_product(&self, product_id: ProductId) -> Result<Vec<LedgerEntry>>;

    async fn entries_by_actor(&self, actor_id: ActorId) -> Result<Vec<LedgerEntry>>;

    /// Entries whose anchoring is still pending (`proof_reference IS NULL`).
    async fn list_unanchored(&self) -> Result<Vec<LedgerEntry>>;

    /// Administrative delete; returns whether a row existed.
    async fn delete_entry(&self, entry_id: EntryId) -> Result<bool>;
}

/// Result of verifying a proof handle against the timestamping authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorVerification {
    pub verified: bool,
    /// Raw authority output
    pub details: String,
}

/// Anchors movement hashes to the external timestamping authority and
/// verifies previously stored proofs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnchorClient: Send + Sync {
    /// Write the hash bytes to a content-addressed artifact, request a proof
    /// from the authority, and return the proof handle. Fails with
    /// `AnchorUnavailable` when the authority cannot be reached or errors.
    async fn anchor(&self, hash: &Hash256) -> Result<String>;

    /// Verify a stored proof against the authority. Fails with `NotFound`
    /// when the handle does not resolve to a stored artifact.
    async fn verify(&self, proof_reference: &str) -> Result<AnchorVerification>;

    /// Resolve a proof handle to its on-disk artifact, checking both the
    /// handle shape (no traversal) and the file's existence.
    async fn resolve_artifact(&self, proof_reference: &str) -> Result<PathBuf>;
}
