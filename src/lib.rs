//! Stock Ledger Library
//!
//! Inventory stock tracking where every stock-affecting movement is recorded
//! as an immutable ledger entry, hashed, and anchored to an external
//! timestamping authority.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (products, movements, ledger entries)
//! - [`infra`] - Infrastructure implementations (PostgreSQL, SQLite, retry)
//! - [`crypto`] - Movement content hashing
//! - [`anchor`] - Proof artifacts and the timestamping authority boundary
//! - [`processor`] - Movement orchestration and anchoring policy
//! - [`api`] - REST API routes
//! - [`telemetry`] - Logging and tracing setup

pub mod anchor;
pub mod api;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod migrations;
pub mod processor;
pub mod server;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{
    ActorContext, ActorId, AppliedMovement, EntryId, LedgerEntry, MovementDirection,
    MovementRecord, MovementRequest, NewProduct, Product, ProductFilter, ProductId, ProductUpdate,
};

pub use infra::{
    AnchorClient, AnchorVerification, LedgerError, LedgerStore, PgLedgerStore, Result,
    SqliteLedgerStore,
};

pub use processor::MovementProcessor;
