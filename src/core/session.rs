//! Editing session
//!
//! Ties the auto-save synchronizer to the export reconciler and drives the flows that
//! involve both: save all, add line, line and group deletion, and document import.

use crate::adapters::ledger::{Ledgers, PackingLedger};
use crate::config::PacklineConfig;
use crate::core::quantity;
use crate::core::reconcile::ExportReconciler;
use crate::core::store::{NewLine, StoreAction};
use crate::core::sync::{AutoSaveSynchronizer, SyncReport};
use crate::domain::{
    DeleteGroupResponse, DeleteLineResponse, GroupId, LedgerLine, LineId, PackingCode,
    PackingGroup, PackingListDocument, PacklineError, ProjectId, ProjectInventory, Result,
};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Outcome of reconciling one project
pub type ReconcileOutcome = (ProjectId, Result<ProjectInventory>);

/// Result of a session flow that persists and then reconciles
#[derive(Debug, Default)]
pub struct SessionReport {
    pub sync: SyncReport,
    pub reconciliations: Vec<ReconcileOutcome>,
}

impl SessionReport {
    fn with_sync(sync: SyncReport) -> Self {
        Self {
            sync,
            reconciliations: Vec::new(),
        }
    }

    /// Successfully reconciled inventories
    pub fn reconciled(&self) -> impl Iterator<Item = &ProjectInventory> {
        self.reconciliations.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Projects whose reconciliation failed, with the error
    pub fn rejected(&self) -> impl Iterator<Item = (&ProjectId, &PacklineError)> {
        self.reconciliations
            .iter()
            .filter_map(|(p, r)| r.as_ref().err().map(|e| (p, e)))
    }

    /// Every line persisted and every project reconciled
    pub fn is_successful(&self) -> bool {
        self.sync.is_successful() && self.rejected().next().is_none()
    }
}

/// Result of a line or group deletion
#[derive(Debug, Default)]
pub struct DeletionReport {
    /// Rows removed from the packing ledger
    pub deleted: Vec<LedgerLine>,

    /// Staged lines dropped from the session
    pub unstaged: usize,

    pub reconciliations: Vec<ReconcileOutcome>,
}

impl DeletionReport {
    pub fn line_response(&self) -> DeleteLineResponse {
        DeleteLineResponse {
            success: !self.deleted.is_empty() || self.unstaged > 0,
        }
    }

    pub fn group_response(&self) -> DeleteGroupResponse {
        DeleteGroupResponse {
            success: true,
            deleted_count: self.deleted.len(),
        }
    }
}

/// Counts from a document import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub groups: usize,
    pub lines: usize,

    /// Entries the store refused, with the reason
    pub rejected: Vec<String>,

    /// Import stopped early on shutdown
    pub interrupted: bool,
}

/// One user's editing session over the packing ledger
pub struct PackingSession {
    sync: Arc<AutoSaveSynchronizer>,
    reconciler: Arc<ExportReconciler>,
    packing: Arc<dyn PackingLedger + Send + Sync>,
}

impl PackingSession {
    pub fn new(ledgers: Ledgers, config: &PacklineConfig) -> Self {
        let sync = AutoSaveSynchronizer::new(
            ledgers.packing.clone(),
            config.autosave.clone(),
            config.session.default_date_or_today(),
        );
        let reconciler = ExportReconciler::new(
            ledgers.packing.clone(),
            ledgers.inventory,
            config.reconcile.clone(),
        );
        Self {
            sync: Arc::new(sync),
            reconciler: Arc::new(reconciler),
            packing: ledgers.packing,
        }
    }

    pub fn synchronizer(&self) -> &Arc<AutoSaveSynchronizer> {
        &self.sync
    }

    pub fn reconciler(&self) -> &Arc<ExportReconciler> {
        &self.reconciler
    }

    /// Start the debounced auto-save worker
    pub fn start_autosave(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        self.sync.spawn_worker(shutdown)
    }

    /// Apply an edit; the auto-save worker persists it after the debounce window
    pub async fn edit(&self, action: StoreAction, date_input: Option<NaiveDate>) -> Result<()> {
        self.sync.submit(action, date_input).await.map(|_| ())
    }

    /// Persist every pending line, then reconcile every project linked to the session
    pub async fn save_all(&self, date_input: Option<NaiveDate>) -> SessionReport {
        let mut report = SessionReport::with_sync(self.sync.flush(date_input).await);
        let projects = self.sync.snapshot().await.linked_projects();
        report.reconciliations = self.reconcile(projects).await;
        report
    }

    /// Add a line to a group
    ///
    /// Unsaved lines are flushed first, the new line is persisted with `force_insert`,
    /// and its project is reconciled.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the group is unknown or the id already exists.
    pub async fn add_line(
        &self,
        group_id: GroupId,
        line: NewLine,
        date_input: Option<NaiveDate>,
    ) -> Result<(LineId, SessionReport)> {
        let line_id = line.id;
        let mut sync = self.sync.flush(date_input).await;

        self.sync
            .submit(StoreAction::AddLine { group_id, line }, date_input)
            .await?;
        sync.merge(self.sync.flush(date_input).await);

        let mut report = SessionReport::with_sync(sync);
        let project = self
            .sync
            .snapshot()
            .await
            .line(&line_id)
            .and_then(|l| l.project_id.clone());
        report.reconciliations = self.reconcile(project).await;
        Ok((line_id, report))
    }

    /// Delete one line from the ledger and the session
    ///
    /// The ledger row goes first; the line is unstaged only once that succeeded, so a
    /// failed delete leaves the session untouched. A line that was never staged in this
    /// session is still removed from the ledger. Its project, if any, is reconciled
    /// afterwards.
    pub async fn delete_line(&self, line_id: &LineId) -> Result<DeletionReport> {
        let mut report = DeletionReport::default();
        let mut projects = BTreeSet::new();

        {
            let _passes = self.sync.hold_passes().await;

            if let Some(row) = self.packing.delete_line(line_id).await? {
                projects.extend(row.project_id.clone());
                report.deleted.push(row);
            }

            if self.sync.snapshot().await.line(line_id).is_some() {
                let changes = self
                    .sync
                    .submit(StoreAction::RemoveLine { line_id: *line_id }, None)
                    .await?;
                report.unstaged = changes.removed.len();
                projects.extend(changes.removed.into_iter().filter_map(|l| l.project_id));
            }
        }

        tracing::info!(
            line_id = %line_id,
            deleted = report.deleted.len(),
            unstaged = report.unstaged,
            "Line deleted"
        );

        report.reconciliations = self.reconcile(projects).await;
        Ok(report)
    }

    /// Delete every line of a packing code on a date
    ///
    /// Ledger rows go first. A matching staged group also has its lines' rows deleted
    /// by id, since they may have been written under the date input or a line's own
    /// date; the group is unstaged only once every delete succeeded. Projects
    /// referenced by the removed lines are reconciled; a group with no linked project
    /// skips reconciliation.
    pub async fn delete_group(
        &self,
        packing_code: &PackingCode,
        pl_date: NaiveDate,
    ) -> Result<DeletionReport> {
        let mut report = DeletionReport::default();
        let mut projects = BTreeSet::new();

        {
            let _passes = self.sync.hold_passes().await;
            let staged = self.sync.staged_group(packing_code, pl_date).await;

            report.deleted = self.packing.delete_group(packing_code, pl_date).await?;

            if let Some((group_id, line_ids)) = staged {
                for line_id in line_ids {
                    if report.deleted.iter().any(|row| row.line_id == line_id) {
                        continue;
                    }
                    if let Some(row) = self.packing.delete_line(&line_id).await? {
                        report.deleted.push(row);
                    }
                }

                let changes = self
                    .sync
                    .submit(StoreAction::RemoveGroup { group_id }, None)
                    .await?;
                report.unstaged = changes.removed.len();
                projects.extend(changes.removed.into_iter().filter_map(|l| l.project_id));
            }
        }
        projects.extend(report.deleted.iter().filter_map(|l| l.project_id.clone()));

        tracing::info!(
            packing_code = %packing_code,
            pl_date = %pl_date,
            deleted = report.deleted.len(),
            unstaged = report.unstaged,
            projects = projects.len(),
            "Packing group deleted"
        );

        report.reconciliations = self.reconcile(projects).await;
        Ok(report)
    }

    /// Stage a packing list document
    ///
    /// Packaging fields and box counts go through lenient coercion. A group the store
    /// refuses is skipped with its lines; the rest of the document is still staged.
    /// When `shutdown` flips, the import stops between groups.
    pub async fn import_document(
        &self,
        document: &PackingListDocument,
        date_input: Option<NaiveDate>,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> ImportSummary {
        let start = Instant::now();
        let mut summary = ImportSummary::default();

        for entry in &document.groups {
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                tracing::warn!(
                    imported_groups = summary.groups,
                    "Shutdown requested, stopping import"
                );
                summary.interrupted = true;
                break;
            }

            let mut group = PackingGroup::new(
                entry.packing_code.as_deref().and_then(|c| PackingCode::new(c).ok()),
                quantity::coerce_value(&entry.box_count),
            );
            group.pl_date = entry.pl_date.or(document.pl_date);
            group.logistic_company = entry
                .logistic_company
                .as_ref()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            group.project_id = parse_project(entry.project_id.as_deref());
            let group_id = group.id;

            if let Err(e) = self.sync.submit(StoreAction::AddGroup(group), date_input).await {
                tracing::warn!(
                    packing_code = ?entry.packing_code,
                    error = %e,
                    "Skipping packing group"
                );
                summary.rejected.push(format!("group {:?}: {}", entry.packing_code, e));
                continue;
            }
            summary.groups += 1;

            for doc_line in &entry.lines {
                let mut line = NewLine::new(doc_line.product_name.trim())
                    .with_sku(doc_line.sku.trim())
                    .with_packaging(
                        quantity::coerce_value(&doc_line.packaging_method),
                        quantity::coerce_value(&doc_line.packaging_count),
                    );
                if let Some(id) = doc_line.line_id {
                    line = line.with_id(id);
                }
                if let Some(project_id) = parse_project(doc_line.project_id.as_deref()) {
                    line = line.with_project(project_id);
                }
                if let Some(pl_date) = doc_line.pl_date {
                    line = line.with_pl_date(pl_date);
                }

                match self
                    .sync
                    .submit(StoreAction::AddLine { group_id, line }, date_input)
                    .await
                {
                    Ok(_) => summary.lines += 1,
                    Err(e) => {
                        tracing::warn!(
                            product_name = %doc_line.product_name,
                            error = %e,
                            "Skipping line"
                        );
                        summary
                            .rejected
                            .push(format!("line {:?}: {}", doc_line.product_name, e));
                    }
                }
            }
        }

        tracing::info!(
            groups = summary.groups,
            lines = summary.lines,
            rejected = summary.rejected.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Packing list staged"
        );
        summary
    }

    async fn reconcile<I>(&self, projects: I) -> Vec<ReconcileOutcome>
    where
        I: IntoIterator<Item = ProjectId>,
    {
        let projects: Vec<ProjectId> = projects.into_iter().collect();
        if projects.is_empty() {
            tracing::debug!("No linked projects, skipping reconciliation");
            return Vec::new();
        }
        self.reconciler.reconcile_all(projects).await
    }
}

fn parse_project(raw: Option<&str>) -> Option<ProjectId> {
    raw.and_then(|p| ProjectId::new(p).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ledger::InventoryLedger;
    use crate::adapters::memory::InMemoryLedger;
    use crate::config::parse_config;

    fn project() -> ProjectId {
        ProjectId::new("P-1").unwrap()
    }

    async fn session(entry: u64) -> (Arc<InMemoryLedger>, PackingSession) {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .save_inventory(&ProjectInventory::new(project(), entry, entry))
            .await
            .unwrap();
        let config = parse_config(
            "database_target = \"memory\"\n[session]\ndefault_date = \"2024-05-02\"\n",
        )
        .unwrap();
        let session = PackingSession::new(Ledgers::in_memory(ledger.clone()), &config);
        (ledger, session)
    }

    async fn project_group(session: &PackingSession, code: &str, boxes: u32) -> GroupId {
        let group = PackingGroup::new(Some(PackingCode::new(code).unwrap()), boxes)
            .with_project(project());
        let id = group.id;
        session
            .edit(StoreAction::AddGroup(group), None)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_add_line_persists_and_reconciles() {
        let (ledger, session) = session(500).await;
        let group_id = project_group(&session, "PK-001", 10).await;

        let (line_id, report) = session
            .add_line(group_id, NewLine::new("Hinge").with_packaging(5, 2), None)
            .await
            .unwrap();

        assert_eq!(report.sync.inserted, 1);
        assert_eq!(ledger.line(&line_id).await.unwrap().export_quantity, 100);
        let inventory: Vec<_> = report.reconciled().collect();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].export_quantity, 100);
        assert_eq!(inventory[0].remain_quantity, 400);
    }

    #[tokio::test]
    async fn test_delete_line_reconciles_its_project() {
        let (ledger, session) = session(500).await;
        let group_id = project_group(&session, "PK-001", 10).await;
        let (line_id, _) = session
            .add_line(group_id, NewLine::new("Hinge").with_packaging(5, 2), None)
            .await
            .unwrap();

        let report = session.delete_line(&line_id).await.unwrap();
        assert!(report.line_response().success);
        assert_eq!(report.deleted.len(), 1);
        assert_eq!(ledger.line_count().await, 0);

        let stored = ledger.load_inventory(&project()).await.unwrap().unwrap();
        assert_eq!(stored.export_quantity, 0);
        assert_eq!(stored.remain_quantity, 500);
    }

    #[tokio::test]
    async fn test_delete_group_without_project_skips_reconciliation() {
        let (ledger, session) = session(500).await;
        let group = PackingGroup::new(Some(PackingCode::new("PK-M").unwrap()), 2);
        let group_id = group.id;
        session
            .edit(StoreAction::AddGroup(group), None)
            .await
            .unwrap();
        session
            .add_line(group_id, NewLine::new("Loose"), None)
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let report = session
            .delete_group(&PackingCode::new("PK-M").unwrap(), date)
            .await
            .unwrap();
        assert_eq!(report.group_response().deleted_count, 1);
        assert!(report.reconciliations.is_empty());
        assert_eq!(ledger.line_count().await, 0);
        assert!(session.synchronizer().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_import_coerces_and_skips_duplicate_codes() {
        let (_ledger, session) = session(500).await;
        let document = PackingListDocument::from_json(
            r#"{
                "plDate": "2024-05-02",
                "groups": [
                    {"packingCode": "PK-1", "boxCount": "10", "projectId": "P-1",
                     "lines": [{"productName": "A", "packagingMethod": "5 pcs", "packagingCount": 2}]},
                    {"packingCode": "PK-1", "boxCount": 3, "lines": [{"productName": "B"}]},
                    {"packingCode": "PK-2", "boxCount": null,
                     "lines": [{"productName": "C", "packagingMethod": -4, "packagingCount": "x"}]}
                ]
            }"#,
        )
        .unwrap();

        let summary = session.import_document(&document, None, None).await;
        assert_eq!(summary.groups, 2);
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.rejected.len(), 1);

        let store = session.synchronizer().snapshot().await;
        assert_eq!(store.staged_export_quantity(&project()), 100);
    }

    #[tokio::test]
    async fn test_import_stops_on_shutdown() {
        let (_ledger, session) = session(500).await;
        let document = PackingListDocument::from_json(
            r#"{"groups": [{"packingCode": "PK-1", "lines": []}]}"#,
        )
        .unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let summary = session.import_document(&document, None, Some(&rx)).await;
        assert!(summary.interrupted);
        assert_eq!(summary.groups, 0);
    }
}
