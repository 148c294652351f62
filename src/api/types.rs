//! Request/response types for the REST API.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::{ApiError, ErrorCode};
use crate::domain::{ActorContext, ActorId, LedgerEntry, MovementDirection, Product};

/// POST /api/v1/products
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub current_stock: i64,
}

/// PUT /api/v1/products/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub current_stock: Option<i64>,
    pub add_stock: Option<i64>,
}

/// Product list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListQuery {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// Product representation on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id.0,
            code: p.code,
            name: p.name,
            category: p.category,
            current_stock: p.current_stock,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// POST /api/v1/movements/{entry,exit}
#[derive(Debug, Clone, Deserialize)]
pub struct MovementBody {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// Ledger entry export shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    #[serde(rename = "type")]
    pub direction: MovementDirection,
    pub quantity: i64,
    /// Hex SHA-256 of the movement
    pub blockchain_hash: String,
    pub proof_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for EntryResponse {
    fn from(e: LedgerEntry) -> Self {
        Self {
            id: e.id.0,
            product_id: e.product_id.0,
            user_id: e.user_id.0,
            user_email: e.user_email,
            direction: e.direction,
            quantity: e.quantity,
            blockchain_hash: hex::encode(e.content_hash),
            proof_reference: e.proof_reference,
            created_at: e.created_at,
        }
    }
}

/// Entry list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryListQuery {
    pub product_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
}

/// The auth layer in front of this service forwards the validated caller
/// identity in headers; this extractor is the only place they are read.
const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_EMAIL_HEADER: &str = "x-actor-email";

#[axum::async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::new(
                    ErrorCode::ActorContextRequired,
                    format!("missing {ACTOR_ID_HEADER} header"),
                )
            })?;
        let actor_id = Uuid::parse_str(actor_id).map_err(|_| {
            ApiError::new(
                ErrorCode::InvalidActorContext,
                format!("{ACTOR_ID_HEADER} is not a valid UUID"),
            )
        })?;

        let email = parts
            .headers
            .get(ACTOR_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ApiError::new(
                    ErrorCode::ActorContextRequired,
                    format!("missing {ACTOR_EMAIL_HEADER} header"),
                )
            })?;

        Ok(ActorContext::new(ActorId::from_uuid(actor_id), email))
    }
}
