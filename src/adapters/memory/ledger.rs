//! In-memory ledger
//!
//! Implements both ledger traits over process-local maps. Used for the `memory`
//! database target, dry runs and tests.

use crate::adapters::ledger::traits::{CommitOutcome, InventoryLedger, PackingLedger};
use crate::domain::ids::{LineId, PackingCode, ProjectId};
use crate::domain::inventory::ProjectInventory;
use crate::domain::messages::{UpsertAction, UpsertLineRequest, UpsertLineResponse};
use crate::domain::packing::LedgerLine;
use crate::domain::{PacklineError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Process-local packing and inventory ledger
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    lines: RwLock<HashMap<LineId, LedgerLine>>,
    inventories: RwLock<BTreeMap<ProjectId, ProjectInventory>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-populated with existing rows
    pub fn seeded(inventories: Vec<ProjectInventory>, lines: Vec<LedgerLine>) -> Self {
        Self {
            lines: RwLock::new(lines.into_iter().map(|l| (l.line_id, l)).collect()),
            inventories: RwLock::new(
                inventories
                    .into_iter()
                    .map(|i| (i.project_id.clone(), i))
                    .collect(),
            ),
        }
    }

    /// Number of stored line rows
    pub async fn line_count(&self) -> usize {
        self.lines.read().await.len()
    }

    /// Stored row of a line
    pub async fn line(&self, line_id: &LineId) -> Option<LedgerLine> {
        self.lines.read().await.get(line_id).cloned()
    }
}

fn to_ledger_line(request: &UpsertLineRequest) -> LedgerLine {
    LedgerLine {
        line_id: request.line_id,
        packing_code: request.packing_code.clone(),
        pl_date: request.pl_date,
        logistic_company: request.logistic_company.clone(),
        product_name: request.product_name.clone(),
        sku: request.sku.clone(),
        packaging_method: request.packaging_method,
        packaging_count: request.packaging_count,
        box_count: request.box_count,
        quantity_per_box: request.quantity_per_box,
        export_quantity: request.export_quantity(),
        project_id: request.project_id.clone(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl PackingLedger for InMemoryLedger {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_line(&self, request: &UpsertLineRequest) -> Result<UpsertLineResponse> {
        let row = to_ledger_line(request);
        let previous = self.lines.write().await.insert(request.line_id, row);

        let action = match previous {
            Some(_) => UpsertAction::Updated,
            None => UpsertAction::Inserted,
        };
        tracing::trace!(
            line_id = %request.line_id,
            force_insert = request.force_insert,
            action = %action,
            "In-memory upsert"
        );

        Ok(UpsertLineResponse {
            success: true,
            action,
            id: request.line_id,
        })
    }

    async fn delete_line(&self, line_id: &LineId) -> Result<Option<LedgerLine>> {
        Ok(self.lines.write().await.remove(line_id))
    }

    async fn delete_group(
        &self,
        packing_code: &PackingCode,
        pl_date: NaiveDate,
    ) -> Result<Vec<LedgerLine>> {
        let mut lines = self.lines.write().await;
        let doomed: Vec<LineId> = lines
            .values()
            .filter(|l| &l.packing_code == packing_code && l.pl_date == pl_date)
            .map(|l| l.line_id)
            .collect();
        Ok(doomed
            .iter()
            .filter_map(|id| lines.remove(id))
            .collect())
    }

    async fn lines_for_project(&self, project_id: &ProjectId) -> Result<Vec<LedgerLine>> {
        let mut rows: Vec<LedgerLine> = self
            .lines
            .read()
            .await
            .values()
            .filter(|l| l.project_id.as_ref() == Some(project_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.packing_code, a.line_id).cmp(&(&b.packing_code, b.line_id)));
        Ok(rows)
    }

    async fn lines_for_date(&self, pl_date: NaiveDate) -> Result<Vec<LedgerLine>> {
        let mut rows: Vec<LedgerLine> = self
            .lines
            .read()
            .await
            .values()
            .filter(|l| l.pl_date == pl_date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.packing_code, a.line_id).cmp(&(&b.packing_code, b.line_id)));
        Ok(rows)
    }
}

#[async_trait]
impl InventoryLedger for InMemoryLedger {
    async fn load_inventory(&self, project_id: &ProjectId) -> Result<Option<ProjectInventory>> {
        Ok(self.inventories.read().await.get(project_id).cloned())
    }

    async fn save_inventory(&self, inventory: &ProjectInventory) -> Result<()> {
        let mut inventories = self.inventories.write().await;
        let mut record = inventory.clone();

        // Replacing a record invalidates any reconciliation that read the old one
        if let Some(stored) = inventories.get(&inventory.project_id) {
            record.version = stored.version + 1;
        }
        record.updated_at = Utc::now();
        inventories.insert(record.project_id.clone(), record);
        Ok(())
    }

    async fn list_inventories(&self) -> Result<Vec<ProjectInventory>> {
        Ok(self.inventories.read().await.values().cloned().collect())
    }

    async fn commit_export(
        &self,
        project_id: &ProjectId,
        expected_version: u64,
        export_quantity: u64,
    ) -> Result<CommitOutcome> {
        let mut inventories = self.inventories.write().await;
        let current = inventories
            .get(project_id)
            .ok_or_else(|| PacklineError::NotFound(format!("project {project_id}")))?;

        if current.version != expected_version || export_quantity > current.entry_quantity {
            return Ok(CommitOutcome::Conflict);
        }

        let next = current.with_export(export_quantity);
        inventories.insert(project_id.clone(), next.clone());
        Ok(CommitOutcome::Committed(next))
    }
}
