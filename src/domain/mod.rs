//! Domain types for the stock ledger: products, movements, ledger entries.

mod entry;
mod product;
mod types;

pub use entry::{
    AppliedMovement, LedgerEntry, MovementDirection, MovementRecord, MovementRequest,
};
pub use product::{title_case, NewProduct, Product, ProductFilter, ProductUpdate};
pub use types::{hash256_hex, ActorContext, ActorId, EntryId, ProductId};
