//! PostgreSQL ledger integration
//!
//! Stores packing lines and project inventories in PostgreSQL.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::{PostgreSQLInventory, PostgreSQLPackingLine};
