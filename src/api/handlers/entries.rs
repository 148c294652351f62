//! Ledger entry read handlers (audit surface).

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{EntryListQuery, EntryResponse};
use crate::domain::{ActorId, EntryId, ProductId};
use crate::server::AppState;

/// GET /api/v1/entries - List ledger entries, optionally filtered by
/// product or actor.
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = if let Some(product_id) = query.product_id {
        state
            .processor
            .entries_by_product(ProductId::from_uuid(product_id))
            .await?
    } else if let Some(actor_id) = query.actor_id {
        state
            .processor
            .entries_by_actor(ActorId::from_uuid(actor_id))
            .await?
    } else {
        state.processor.entries().await?
    };

    let entries: Vec<EntryResponse> = entries.into_iter().map(Into::into).collect();
    Ok(Json(serde_json::json!({
        "entries": entries,
        "count": entries.len(),
    })))
}

/// GET /api/v1/entries/:id - Fetch one ledger entry.
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state.processor.entry(EntryId::from_uuid(id)).await?;
    Ok(Json(entry.into()))
}

/// DELETE /api/v1/entries/:id - Administrative delete.
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.processor.delete_entry(EntryId::from_uuid(id)).await?;
    if !deleted {
        return Err(crate::infra::LedgerError::EntryNotFound(id).into());
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
