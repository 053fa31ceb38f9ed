// Packline - Packing-List Quantity Engine
// Copyright (c) 2025 Packline Contributors
// Licensed under the MIT License

//! # Packline - Packing-List Quantity Engine
//!
//! Packline keeps manufacturing packing lists in step with a durable packing ledger
//! and reconciles the quantities they imply against each project's inventory.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Computing** export quantities from packaging geometry
//!   (`packaging_method × packaging_count × box_count`)
//! - **Staging** packing groups and lines in a normalized store with pure transitions
//! - **Auto-saving** edited lines with debounced, deduplicated, concurrent upserts
//! - **Reconciling** a project's export quantity from ledger truth, never exceeding the
//!   received quantity
//!
//! ## Architecture
//!
//! Packline follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (quantity, store, sync, reconcile, session)
//! - [`adapters`] - Ledger backends (PostgreSQL, in-memory)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use packline::adapters::ledger::create_ledgers;
//! use packline::config::load_config;
//! use packline::core::session::PackingSession;
//! use packline::core::store::{NewLine, StoreAction};
//! use packline::domain::{PackingCode, PackingGroup, ProjectId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("packline.toml")?;
//!     let ledgers = create_ledgers(&config).await?;
//!     let session = PackingSession::new(ledgers, &config);
//!
//!     let group = PackingGroup::new(Some(PackingCode::new("PK-001")?), 10)
//!         .with_project(ProjectId::new("P-2024-17")?);
//!     let group_id = group.id;
//!     session.edit(StoreAction::AddGroup(group), None).await?;
//!
//!     let (_line_id, report) = session
//!         .add_line(group_id, NewLine::new("Hinge").with_packaging(5, 2), None)
//!         .await?;
//!
//!     for inventory in report.reconciled() {
//!         println!("{}: remain {}", inventory.project_id, inventory.remain_quantity);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Packline uses the [`domain::PacklineError`] type for all errors. A reconciliation
//! that would export more than was received fails with
//! [`domain::PacklineError::ConstraintViolation`], carrying the numeric difference.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
