//! Stock movement handlers.
//!
//! The actor identity arrives already validated from the upstream auth layer
//! and is captured onto the ledger row.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{EntryResponse, MovementBody};
use crate::domain::{ActorContext, MovementRequest, ProductId};
use crate::server::AppState;

/// POST /api/v1/movements/entry - Record a stock increase.
pub async fn record_entry(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(body): Json<MovementBody>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let entry = state
        .processor
        .record_entry(
            MovementRequest {
                product_id: ProductId::from_uuid(body.product_id),
                quantity: body.quantity,
            },
            actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// POST /api/v1/movements/exit - Record a stock decrease.
pub async fn record_exit(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(body): Json<MovementBody>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let entry = state
        .processor
        .record_exit(
            MovementRequest {
                product_id: ProductId::from_uuid(body.product_id),
                quantity: body.quantity,
            },
            actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}
