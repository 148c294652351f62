//! Anchor proof handlers: verification, artifact download, backfill.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::domain::EntryId;
use crate::processor::{BackfillReport, EntryVerification, ProofArtifact};
use crate::server::AppState;

/// GET /api/v1/entries/:id/verify - Verify an entry's anchored proof
/// against the timestamping authority.
pub async fn verify_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EntryVerification>, ApiError> {
    let verification = state.processor.verify_entry(EntryId::from_uuid(id)).await?;
    Ok(Json(verification))
}

/// GET /api/v1/entries/:id/proof - Resolve an entry's proof to a
/// downloadable artifact location.
pub async fn get_proof_artifact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProofArtifact>, ApiError> {
    let artifact = state.processor.proof_artifact(EntryId::from_uuid(id)).await?;
    Ok(Json(artifact))
}

/// POST /api/v1/anchors/backfill - Re-anchor entries whose proof is pending.
pub async fn anchor_backfill(
    State(state): State<AppState>,
) -> Result<Json<BackfillReport>, ApiError> {
    let report = state.processor.anchor_backfill().await?;
    Ok(Json(report))
}
