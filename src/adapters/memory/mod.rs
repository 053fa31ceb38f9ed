//! In-memory ledger backend

pub mod ledger;

pub use ledger::InMemoryLedger;
