//! Storage integrations for Packline.
//!
//! - [`ledger`] - Ledger traits and the backend factory
//! - [`memory`] - In-memory ledger (tests, dry runs, `memory` target)
//! - [`postgresql`] - PostgreSQL ledger
//!
//! # Design Pattern
//!
//! Adapters isolate storage behind the [`ledger::PackingLedger`] and
//! [`ledger::InventoryLedger`] traits, so the synchronizer and reconciler never see
//! driver types.
//!
//! ```rust,no_run
//! use packline::adapters::ledger::create_ledgers;
//! use packline::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("packline.toml")?;
//! let ledgers = create_ledgers(&config).await?;
//! ledgers.packing.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod ledger;
pub mod memory;
pub mod postgresql;
