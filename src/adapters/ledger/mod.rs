//! Ledger abstraction layer
//!
//! Trait-based abstraction over the durable packing ledger and project inventory
//! ledger, so the core works against PostgreSQL or an in-memory store alike.

pub mod factory;
pub mod traits;

pub use factory::{create_dry_run_ledgers, create_ledgers, Ledgers};
pub use traits::{CommitOutcome, InventoryLedger, PackingLedger};
