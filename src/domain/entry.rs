//! Ledger entry and movement types.
//!
//! A ledger entry is the immutable record of one stock-affecting movement.
//! It is created together with the stock mutation in a single unit of work
//! and is never updated afterwards, except for attachment of the proof
//! reference once anchoring completes. Deletion is an administrative
//! override, not a normal lifecycle event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{movement_hash, Hash256, MovementHashParams};

use super::{hash256_hex, ActorContext, ActorId, EntryId, ProductId};

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    /// Increases stock
    Entry,
    /// Decreases stock
    Exit,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::Entry => "entry",
            MovementDirection::Exit => "exit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(MovementDirection::Entry),
            "exit" => Some(MovementDirection::Exit),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A movement as requested by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// A fully-prepared movement, ready for the store's atomic apply.
///
/// The content hash is computed before the unit of work begins, over the
/// same `created_at` instant that is persisted on the entry.
#[derive(Debug, Clone)]
pub struct MovementRecord {
    pub entry_id: EntryId,
    pub product_id: ProductId,
    pub actor: ActorContext,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub content_hash: Hash256,
    pub created_at: DateTime<Utc>,
}

impl MovementRecord {
    /// Prepare a movement record, stamping it with the current instant and
    /// hashing product, quantity, direction, actor email and that instant.
    pub fn prepare(
        request: &MovementRequest,
        actor: ActorContext,
        direction: MovementDirection,
    ) -> Self {
        let created_at = Utc::now();
        let content_hash = movement_hash(&MovementHashParams {
            product_id: &request.product_id.0,
            quantity: request.quantity,
            direction: direction.as_str(),
            actor_email: &actor.email,
            created_at: &created_at,
        });

        Self {
            entry_id: EntryId::new(),
            product_id: request.product_id,
            actor,
            direction,
            quantity: request.quantity,
            content_hash,
            created_at,
        }
    }
}

/// Immutable record of one committed stock movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub product_id: ProductId,
    /// Actor identity captured at creation time, not live-looked-up
    pub user_id: ActorId,
    pub user_email: String,
    pub direction: MovementDirection,
    pub quantity: i64,
    /// SHA-256 over the movement fields and creation instant, hex-encoded on the wire
    #[serde(with = "hash256_hex")]
    pub content_hash: Hash256,
    /// Handle of the anchored proof artifact; `None` while anchoring is pending
    pub proof_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The entry as it is committed, before any proof is attached.
    pub fn from_record(record: MovementRecord) -> Self {
        Self {
            id: record.entry_id,
            product_id: record.product_id,
            user_id: record.actor.actor_id,
            user_email: record.actor.email,
            direction: record.direction,
            quantity: record.quantity,
            content_hash: record.content_hash,
            proof_reference: None,
            created_at: record.created_at,
        }
    }

    /// Whether the entry still awaits an anchor proof.
    pub fn is_anchor_pending(&self) -> bool {
        self.proof_reference.is_none()
    }
}

/// Result of an atomic movement apply: the updated product plus the entry
/// that records the movement.
#[derive(Debug, Clone)]
pub struct AppliedMovement {
    pub product: super::Product,
    pub entry: LedgerEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_actor() -> ActorContext {
        ActorContext::new(ActorId::new(), "clerk@example.com")
    }

    #[test]
    fn test_direction_roundtrip() {
        assert_eq!(MovementDirection::parse("entry"), Some(MovementDirection::Entry));
        assert_eq!(MovementDirection::parse("exit"), Some(MovementDirection::Exit));
        assert_eq!(MovementDirection::parse("transfer"), None);
        assert_eq!(MovementDirection::Entry.as_str(), "entry");
    }

    #[test]
    fn test_direction_serde_lowercase() {
        let json = serde_json::to_string(&MovementDirection::Exit).unwrap();
        assert_eq!(json, r#""exit""#);
        let parsed: MovementDirection = serde_json::from_str(r#""entry""#).unwrap();
        assert_eq!(parsed, MovementDirection::Entry);
    }

    #[test]
    fn test_prepare_captures_actor_and_direction() {
        let request = MovementRequest {
            product_id: ProductId::new(),
            quantity: 7,
        };
        let actor = test_actor();

        let record = MovementRecord::prepare(&request, actor.clone(), MovementDirection::Exit);

        assert_eq!(record.product_id, request.product_id);
        assert_eq!(record.quantity, 7);
        assert_eq!(record.direction, MovementDirection::Exit);
        assert_eq!(record.actor, actor);
    }

    #[test]
    fn test_entry_from_record_is_pending() {
        let request = MovementRequest {
            product_id: ProductId::new(),
            quantity: 2,
        };
        let record = MovementRecord::prepare(&request, test_actor(), MovementDirection::Entry);
        let hash = record.content_hash;

        let entry = LedgerEntry::from_record(record);

        assert!(entry.is_anchor_pending());
        assert_eq!(entry.content_hash, hash);
        assert_eq!(entry.user_email, "clerk@example.com");
    }

    #[test]
    fn test_entry_hash_serializes_as_hex() {
        let record = MovementRecord::prepare(
            &MovementRequest {
                product_id: ProductId::new(),
                quantity: 1,
            },
            test_actor(),
            MovementDirection::Entry,
        );
        let entry = LedgerEntry::from_record(record);

        let json = serde_json::to_value(&entry).unwrap();
        let hash_str = json["content_hash"].as_str().unwrap();
        assert_eq!(hash_str.len(), 64);
        assert!(hash_str.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
