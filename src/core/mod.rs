//! Core business logic for Packline.
//!
//! # Modules
//!
//! - [`quantity`] - Export quantity derivation and lenient input coercion
//! - [`store`] - Normalized packing line store with pure transitions
//! - [`sync`] - Debounced auto-save of staged lines to the packing ledger
//! - [`reconcile`] - Export quantity reconciliation against project inventory
//! - [`session`] - Editing session flows (save all, add line, deletion, import)
//!
//! # Workflow
//!
//! 1. **Edit**: actions are applied to the store, recomputing export quantities
//! 2. **Auto-save**: after the debounce window, dirty lines are upserted concurrently
//! 3. **Reconcile**: after save all, add line or deletion, each affected project's export
//!    quantity is recomputed from the ledger and committed if it fits the entry quantity
//!
//! # Example
//!
//! ```rust,no_run
//! use packline::adapters::ledger::create_ledgers;
//! use packline::config::load_config;
//! use packline::core::session::PackingSession;
//! use packline::domain::PackingListDocument;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("packline.toml")?;
//! let ledgers = create_ledgers(&config).await?;
//! let session = PackingSession::new(ledgers, &config);
//!
//! let document = PackingListDocument::from_json(&std::fs::read_to_string("list.json")?)?;
//! session.import_document(&document, None, None).await;
//!
//! let report = session.save_all(None).await;
//! println!("Persisted: {}", report.sync.persisted());
//! # Ok(())
//! # }
//! ```

pub mod quantity;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod sync;
