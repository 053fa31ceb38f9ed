//! Export reconciler
//!
//! Recomputes a project's export quantity from the packing ledger and commits it to the
//! inventory ledger. Reconciliations of one project are serialized in-process by a
//! per-project lock, and across processes by the inventory record's version.

use crate::adapters::ledger::{CommitOutcome, InventoryLedger, PackingLedger};
use crate::config::ReconcileConfig;
use crate::core::quantity;
use crate::domain::{
    ConstraintViolation, LedgerLine, PacklineError, ProjectId, ProjectInventory,
    ReconcileResponse, Result,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sum of `packaging_method × packaging_count × box_count` over ledger rows
///
/// Stored export quantities are ignored; every row is recomputed.
pub fn candidate_export_quantity(lines: &[LedgerLine]) -> u64 {
    lines
        .iter()
        .map(|line| quantity::compute(line.packaging_method, line.packaging_count, line.box_count))
        .fold(0u64, u64::saturating_add)
}

/// Writes authoritative export quantities into the inventory ledger
pub struct ExportReconciler {
    packing: Arc<dyn PackingLedger + Send + Sync>,
    inventory: Arc<dyn InventoryLedger + Send + Sync>,
    config: ReconcileConfig,
    locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl ExportReconciler {
    pub fn new(
        packing: Arc<dyn PackingLedger + Send + Sync>,
        inventory: Arc<dyn InventoryLedger + Send + Sync>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            packing,
            inventory,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn project_lock(&self, project_id: &ProjectId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(project_id.clone()).or_default())
    }

    /// Drops the project's lock entry once no other run holds or awaits it
    async fn release_project_lock(&self, project_id: &ProjectId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(project_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(project_id);
        }
    }

    /// Reconcile one project
    ///
    /// # Returns
    ///
    /// The inventory record after the commit. When the recomputed quantity already
    /// matches the stored one, the stored record is returned without a write.
    ///
    /// # Errors
    ///
    /// - `ConstraintViolation` if the recomputed quantity exceeds the entry quantity;
    ///   the inventory ledger is left unchanged
    /// - `NotFound` if the project has no inventory record
    /// - `LockContention` if every attempt lost an optimistic-lock race
    pub async fn reconcile(&self, project_id: &ProjectId) -> Result<ProjectInventory> {
        let lock = self.project_lock(project_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.reconcile_locked(project_id).await
        };
        self.release_project_lock(project_id, lock).await;
        result
    }

    async fn reconcile_locked(&self, project_id: &ProjectId) -> Result<ProjectInventory> {
        let max_attempts = self.config.max_attempts;
        for attempt in 0..max_attempts {
            let current = self
                .inventory
                .load_inventory(project_id)
                .await?
                .ok_or_else(|| PacklineError::NotFound(format!("project {project_id}")))?;
            let lines = self.packing.lines_for_project(project_id).await?;
            let candidate = candidate_export_quantity(&lines);

            tracing::debug!(
                project_id = %project_id,
                lines = lines.len(),
                candidate_export_quantity = candidate,
                entry_quantity = current.entry_quantity,
                version = current.version,
                "Recomputed export quantity"
            );

            if candidate > current.entry_quantity {
                let violation = ConstraintViolation::new(candidate, current.entry_quantity);
                tracing::warn!(
                    project_id = %project_id,
                    candidate_export_quantity = violation.candidate_export_quantity,
                    entry_quantity = violation.entry_quantity,
                    difference = violation.difference,
                    "Reconciliation rejected"
                );
                return Err(PacklineError::ConstraintViolation(violation));
            }

            if candidate == current.export_quantity && current.is_consistent() {
                tracing::debug!(project_id = %project_id, "Export quantity already current");
                return Ok(current);
            }

            match self
                .inventory
                .commit_export(project_id, current.version, candidate)
                .await?
            {
                CommitOutcome::Committed(inventory) => {
                    crate::log_reconcile_outcome!(
                        project_id,
                        inventory.export_quantity,
                        inventory.remain_quantity,
                        attempt + 1
                    );
                    return Ok(inventory);
                }
                CommitOutcome::Conflict => {
                    if attempt + 1 < max_attempts {
                        crate::log_retry_attempt!(
                            attempt + 1,
                            max_attempts,
                            "inventory record changed concurrently"
                        );
                        tokio::time::sleep(self.config.backoff(attempt)).await;
                    }
                }
            }
        }

        tracing::error!(
            project_id = %project_id,
            attempts = max_attempts,
            "Reconciliation gave up on lock contention"
        );
        Err(PacklineError::LockContention {
            project_id: project_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Reconcile one project and render the outcome in wire form
    pub async fn respond(&self, project_id: &ProjectId) -> ReconcileResponse {
        match self.reconcile(project_id).await {
            Ok(inventory) => {
                ReconcileResponse::success(inventory.export_quantity, inventory.remain_quantity)
            }
            Err(e) => ReconcileResponse::failure(&e),
        }
    }

    /// Reconcile several projects concurrently
    ///
    /// Each project gets its own outcome; one failure does not stop the others.
    pub async fn reconcile_all<I>(&self, project_ids: I) -> Vec<(ProjectId, Result<ProjectInventory>)>
    where
        I: IntoIterator<Item = ProjectId>,
    {
        join_all(project_ids.into_iter().map(|project_id| async move {
            let result = self.reconcile(&project_id).await;
            (project_id, result)
        }))
        .await
    }
}
