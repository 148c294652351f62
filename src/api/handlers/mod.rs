//! REST API handlers.

pub mod entries;
pub mod health;
pub mod movements;
pub mod products;
pub mod proofs;
