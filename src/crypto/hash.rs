//! Movement content hashing.
//!
//! Each committed movement carries a SHA-256 digest over its product,
//! quantity, direction, actor email and creation instant. The instant is part
//! of the preimage, so the digest is reproducible only given the exact
//! `created_at` stored on the entry; the authoritative value is the one the
//! processor computed and anchored at creation time.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// 32-byte SHA-256 hash
pub type Hash256 = [u8; 32];

/// Inputs to the movement content hash.
pub struct MovementHashParams<'a> {
    pub product_id: &'a Uuid,
    pub quantity: i64,
    /// `"entry"` or `"exit"`
    pub direction: &'a str,
    pub actor_email: &'a str,
    /// The instant persisted as the entry's `created_at`
    pub created_at: &'a DateTime<Utc>,
}

/// Render the hash preimage.
///
/// Format: `{product_id}-{quantity}-{direction}-{actor_email}-{created_at}`,
/// with the instant in RFC 3339 at microsecond precision.
pub fn movement_preimage(params: &MovementHashParams) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        params.product_id,
        params.quantity,
        params.direction,
        params.actor_email,
        params.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    )
}

/// Compute the movement content hash.
pub fn movement_hash(params: &MovementHashParams) -> Hash256 {
    sha256(movement_preimage(params).as_bytes())
}

/// Hash raw bytes with SHA-256
pub fn sha256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Content-addressed artifact stem for a movement hash (lowercase hex).
///
/// The anchor client stores the raw hash bytes as `<stem>.bin` and the
/// authority's proof as `<stem>.bin.ots`.
pub fn artifact_stem(hash: &Hash256) -> String {
    hex::encode(hash)
}
