//! Ledger abstraction traits
//!
//! This module defines the traits that storage adapters must implement
//! to back the packing ledger and the project inventory ledger.

use crate::domain::ids::{LineId, PackingCode, ProjectId};
use crate::domain::inventory::ProjectInventory;
use crate::domain::messages::{UpsertLineRequest, UpsertLineResponse};
use crate::domain::packing::LedgerLine;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Outcome of an optimistic export commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The stored version matched; carries the record as written
    Committed(ProjectInventory),

    /// Another writer committed first
    Conflict,
}

/// Authoritative store of persisted packing lines
///
/// Rows are keyed by line id. Every write is scoped to a single row, so concurrent
/// upserts of different lines never need cross-row locking.
#[async_trait]
pub trait PackingLedger: Send + Sync {
    /// Test the ledger connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Ensure tables and indexes exist
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert or update one packing line
    ///
    /// A row with the request's line id is updated in place; otherwise a row is
    /// inserted. `force_insert` never produces a second row for the same id, so
    /// resending a request is always safe.
    ///
    /// # Errors
    ///
    /// Returns `Transport` or `Connection` when the write did not reach the store.
    async fn upsert_line(&self, request: &UpsertLineRequest) -> Result<UpsertLineResponse>;

    /// Delete one line
    ///
    /// # Returns
    ///
    /// Returns the deleted row, or `None` if no row had this id.
    async fn delete_line(&self, line_id: &LineId) -> Result<Option<LedgerLine>>;

    /// Delete every line of a packing code on a date
    ///
    /// # Returns
    ///
    /// Returns the deleted rows.
    async fn delete_group(
        &self,
        packing_code: &PackingCode,
        pl_date: NaiveDate,
    ) -> Result<Vec<LedgerLine>>;

    /// All persisted lines linked to a project
    async fn lines_for_project(&self, project_id: &ProjectId) -> Result<Vec<LedgerLine>>;

    /// All persisted lines of a packing list date
    async fn lines_for_date(&self, pl_date: NaiveDate) -> Result<Vec<LedgerLine>>;
}

/// Per-project quantity records
///
/// Owned by the project subsystem; the export reconciler is the only writer of
/// export and remain quantities.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Load the inventory of a project
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(ProjectInventory))` if found, `Ok(None)` if not found.
    async fn load_inventory(&self, project_id: &ProjectId) -> Result<Option<ProjectInventory>>;

    /// Create or replace an inventory record
    ///
    /// Used when seeding projects; reconciliation goes through [`Self::commit_export`].
    async fn save_inventory(&self, inventory: &ProjectInventory) -> Result<()>;

    /// All inventory records, ordered by project id
    async fn list_inventories(&self) -> Result<Vec<ProjectInventory>>;

    /// Write a new export quantity if the stored version still equals `expected_version`
    ///
    /// On success the stored version is bumped and the remain quantity recomputed from
    /// the stored entry quantity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project has no inventory record.
    async fn commit_export(
        &self,
        project_id: &ProjectId,
        expected_version: u64,
        export_quantity: u64,
    ) -> Result<CommitOutcome>;
}
