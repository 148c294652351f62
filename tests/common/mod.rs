//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use stock_ledger::anchor::{
    ArtifactStore, AuthorityResponse, HashAnchorClient, TimestampAuthority,
};
use stock_ledger::domain::{
    ActorContext, ActorId, MovementDirection, MovementRecord, MovementRequest, NewProduct,
    ProductId,
};
use stock_ledger::infra::RetryConfig;
use stock_ledger::{LedgerError, LedgerStore, Result, SqliteLedgerStore};

/// Test actor with a fixed identity
pub fn test_actor() -> ActorContext {
    ActorContext::new(
        ActorId::from_uuid(uuid::Uuid::parse_str("33333333-3333-3333-3333-333333333333").unwrap()),
        "clerk@example.com",
    )
}

/// A second actor, for by-actor filtering tests
pub fn other_actor() -> ActorContext {
    ActorContext::new(
        ActorId::from_uuid(uuid::Uuid::parse_str("44444444-4444-4444-4444-444444444444").unwrap()),
        "auditor@example.com",
    )
}

/// Open a fresh SQLite-backed store in a temp directory
pub async fn temp_store() -> (TempDir, SqliteLedgerStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let store = SqliteLedgerStore::from_path(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    (dir, store)
}

/// Create a product with the given stock and a unique code
pub async fn seed_product(store: &dyn LedgerStore, name: &str, stock: i64) -> ProductId {
    let code = format!("P-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let product = store
        .create_product(
            NewProduct {
                code,
                name: name.to_string(),
                category: "Tools".to_string(),
                current_stock: stock,
            }
            .normalized(),
        )
        .await
        .unwrap();
    product.id
}

/// Prepare a movement record the way the processor does
pub fn movement(
    product_id: ProductId,
    quantity: i64,
    direction: MovementDirection,
) -> MovementRecord {
    MovementRecord::prepare(
        &MovementRequest {
            product_id,
            quantity,
        },
        test_actor(),
        direction,
    )
}

/// Authority double that behaves like the OpenTimestamps CLI: `stamp`
/// drops a proof file next to the payload, `verify` confirms it.
pub struct StubAuthority;

#[async_trait]
impl TimestampAuthority for StubAuthority {
    async fn stamp(&self, payload: &Path) -> Result<()> {
        let proof = format!("{}.ots", payload.display());
        tokio::fs::write(proof, b"stub-proof").await.unwrap();
        Ok(())
    }

    async fn verify(&self, _proof: &Path) -> Result<AuthorityResponse> {
        Ok(AuthorityResponse {
            attested: true,
            output: "Success! Bitcoin block 800000 attests existence".to_string(),
        })
    }
}

/// Authority double that is unreachable
pub struct OfflineAuthority;

#[async_trait]
impl TimestampAuthority for OfflineAuthority {
    async fn stamp(&self, _payload: &Path) -> Result<()> {
        Err(LedgerError::AnchorUnavailable("calendar unreachable".into()))
    }

    async fn verify(&self, _proof: &Path) -> Result<AuthorityResponse> {
        Err(LedgerError::AnchorUnavailable("calendar unreachable".into()))
    }
}

/// Anchor client over a temp artifact directory and the given authority
pub fn anchor_client(
    dir: &TempDir,
    authority: Arc<dyn TimestampAuthority>,
) -> Arc<HashAnchorClient> {
    Arc::new(
        HashAnchorClient::new(ArtifactStore::new(dir.path()), authority)
            .with_retry(RetryConfig::none()),
    )
}
