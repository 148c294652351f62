//! SQLite implementations for local and embedded deployments.

mod ledger;

pub use ledger::SqliteLedgerStore;
