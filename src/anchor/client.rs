//! Hash anchor client.
//!
//! Bridges the ledger to the external timestamping authority: persists the
//! raw hash bytes as a content-addressed artifact, requests a proof, and
//! later verifies proofs on demand. Anchoring always happens strictly after
//! the movement's unit of work has committed.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::crypto::{artifact_stem, Hash256};
use crate::infra::{retry, AnchorClient, AnchorVerification, Result, RetryConfig};

use super::{ArtifactStore, TimestampAuthority};

/// Anchor client over an artifact directory and a timestamping authority.
pub struct HashAnchorClient {
    artifacts: ArtifactStore,
    authority: Arc<dyn TimestampAuthority>,
    retry: RetryConfig,
}

impl HashAnchorClient {
    pub fn new(artifacts: ArtifactStore, authority: Arc<dyn TimestampAuthority>) -> Self {
        Self {
            artifacts,
            authority,
            retry: RetryConfig::external_service(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    fn payload_name(hash: &Hash256) -> String {
        format!("{}.bin", artifact_stem(hash))
    }

    fn proof_name(hash: &Hash256) -> String {
        // `ots stamp <file>` writes the proof to `<file>.ots`.
        format!("{}.ots", Self::payload_name(hash))
    }
}

#[async_trait]
impl AnchorClient for HashAnchorClient {
    #[instrument(skip(self, hash), fields(stem = %artifact_stem(hash)))]
    async fn anchor(&self, hash: &Hash256) -> Result<String> {
        let payload_name = Self::payload_name(hash);
        let payload_path = self.artifacts.write(&payload_name, hash).await?;

        retry(&self.retry, "ots stamp", || {
            self.authority.stamp(&payload_path)
        })
        .await?;

        let proof_name = Self::proof_name(hash);
        info!(proof = %proof_name, "movement hash anchored");
        Ok(proof_name)
    }

    #[instrument(skip(self))]
    async fn verify(&self, proof_reference: &str) -> Result<AnchorVerification> {
        let proof_path = self.artifacts.resolve_existing(proof_reference).await?;
        let response = self.authority.verify(&proof_path).await?;

        Ok(AnchorVerification {
            verified: response.attested,
            details: response.output,
        })
    }

    async fn resolve_artifact(&self, proof_reference: &str) -> Result<PathBuf> {
        self.artifacts.resolve_existing(proof_reference).await
    }
}
