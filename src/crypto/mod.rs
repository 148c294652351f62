//! Cryptographic utilities: movement content hashing.

mod hash;

pub use hash::{
    artifact_stem, movement_hash, movement_preimage, sha256, Hash256, MovementHashParams,
};
