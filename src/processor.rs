//! Movement processor: orchestrates validation, the atomic stock+ledger unit
//! of work, and post-commit anchoring.
//!
//! # Anchoring failure policy
//!
//! Once the unit of work has committed, the movement has happened. Anchor
//! failures of any kind therefore never fail the request: the entry is left
//! with `proof_reference = NULL` ("anchor pending") and picked up by a later
//! backfill pass.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::{
    ActorContext, ActorId, EntryId, LedgerEntry, MovementDirection, MovementRecord,
    MovementRequest, ProductId,
};
use crate::infra::{
    AnchorClient, AnchorVerification, LedgerError, LedgerStore, Result,
};

/// Location of a downloadable proof artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub directory: String,
    pub filename: String,
}

/// Outcome of verifying one entry's anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryVerification {
    pub entry_id: EntryId,
    pub proof_reference: String,
    pub verified: bool,
    pub details: String,
}

/// Summary of one anchor backfill pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackfillReport {
    pub examined: u64,
    pub anchored: u64,
    pub still_pending: u64,
}

/// Orchestrates stock movements against an explicit store handle and anchor
/// client, so tests can substitute either.
pub struct MovementProcessor {
    store: Arc<dyn LedgerStore>,
    anchor: Arc<dyn AnchorClient>,
}

impl MovementProcessor {
    pub fn new(store: Arc<dyn LedgerStore>, anchor: Arc<dyn AnchorClient>) -> Self {
        Self { store, anchor }
    }

    /// Record a stock entry (increase) and anchor its ledger row.
    #[instrument(skip(self, actor), fields(product_id = %request.product_id, quantity = request.quantity))]
    pub async fn record_entry(
        &self,
        request: MovementRequest,
        actor: ActorContext,
    ) -> Result<LedgerEntry> {
        self.record(request, actor, MovementDirection::Entry).await
    }

    /// Record a stock exit (decrease) and anchor its ledger row.
    #[instrument(skip(self, actor), fields(product_id = %request.product_id, quantity = request.quantity))]
    pub async fn record_exit(
        &self,
        request: MovementRequest,
        actor: ActorContext,
    ) -> Result<LedgerEntry> {
        self.record(request, actor, MovementDirection::Exit).await
    }

    async fn record(
        &self,
        request: MovementRequest,
        actor: ActorContext,
        direction: MovementDirection,
    ) -> Result<LedgerEntry> {
        if request.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(request.quantity));
        }

        let record = MovementRecord::prepare(&request, actor, direction);

        let applied = match direction {
            MovementDirection::Entry => self.store.apply_entry(record).await?,
            MovementDirection::Exit => self.store.apply_exit(record).await?,
        };
        debug!(
            product_id = %applied.product.id,
            stock = applied.product.current_stock,
            entry_id = %applied.entry.id,
            "movement committed"
        );

        let mut entry = applied.entry;
        match self.try_anchor(&entry).await {
            Ok(proof_reference) => entry.proof_reference = Some(proof_reference),
            Err(e) => {
                warn!(
                    entry_id = %entry.id,
                    error = %e,
                    "anchoring failed, entry left pending"
                );
            }
        }

        Ok(entry)
    }

    async fn try_anchor(&self, entry: &LedgerEntry) -> Result<String> {
        let proof_reference = self.anchor.anchor(&entry.content_hash).await?;
        self.store.attach_proof(entry.id, &proof_reference).await?;
        Ok(proof_reference)
    }

    /// Fetch one entry.
    pub async fn entry(&self, entry_id: EntryId) -> Result<LedgerEntry> {
        self.store
            .entry_by_id(entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id.0))
    }

    /// All committed entries, in commit order.
    pub async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        self.store.list_entries().await
    }

    /// Entries for one product, in commit order.
    pub async fn entries_by_product(&self, product_id: ProductId) -> Result<Vec<LedgerEntry>> {
        self.store.entries_by_product(product_id).await
    }

    /// Entries recorded by one actor, in commit order.
    pub async fn entries_by_actor(&self, actor_id: ActorId) -> Result<Vec<LedgerEntry>> {
        self.store.entries_by_actor(actor_id).await
    }

    /// Administrative delete; returns whether the entry existed.
    pub async fn delete_entry(&self, entry_id: EntryId) -> Result<bool> {
        self.store.delete_entry(entry_id).await
    }

    /// Verify an entry's anchored proof against the authority.
    #[instrument(skip(self))]
    pub async fn verify_entry(&self, entry_id: EntryId) -> Result<EntryVerification> {
        let entry = self.entry(entry_id).await?;
        let proof_reference = entry
            .proof_reference
            .ok_or(LedgerError::AnchorPending(entry_id.0))?;

        let verification: AnchorVerification = self.anchor.verify(&proof_reference).await?;

        Ok(EntryVerification {
            entry_id,
            proof_reference,
            verified: verification.verified,
            details: verification.details,
        })
    }

    /// Resolve an entry's proof to a downloadable artifact location.
    pub async fn proof_artifact(&self, entry_id: EntryId) -> Result<ProofArtifact> {
        let entry = self.entry(entry_id).await?;
        let proof_reference = entry
            .proof_reference
            .ok_or(LedgerError::AnchorPending(entry_id.0))?;

        let path = self.anchor.resolve_artifact(&proof_reference).await?;
        let directory = path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Ok(ProofArtifact {
            directory,
            filename: proof_reference,
        })
    }

    /// Re-anchor entries whose proof is still pending.
    #[instrument(skip(self))]
    pub async fn anchor_backfill(&self) -> Result<BackfillReport> {
        let pending = self.store.list_unanchored().await?;
        let mut report = BackfillReport {
            examined: pending.len() as u64,
            ..Default::default()
        };

        for entry in pending {
            match self.try_anchor(&entry).await {
                Ok(_) => report.anchored += 1,
                Err(e) => {
                    warn!(entry_id = %entry.id, error = %e, "backfill anchoring failed");
                    report.still_pending += 1;
                }
            }
        }

        Ok(report)
    }
}
