//! PostgreSQL implementations of the ledger store.

mod ledger;

pub use ledger::PgLedgerStore;
