//! Shared fixtures for integration tests
//!
//! Fault-injecting wrappers around [`InMemoryLedger`] used to exercise partial
//! upsert failures and optimistic-lock contention.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use packline::adapters::ledger::{CommitOutcome, InventoryLedger, Ledgers, PackingLedger};
use packline::adapters::memory::InMemoryLedger;
use packline::config::{parse_config, PacklineConfig};
use packline::domain::{
    LedgerLine, LineId, PackingCode, PacklineError, ProjectId, ProjectInventory, Result,
    UpsertLineRequest, UpsertLineResponse,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

pub fn project(id: &str) -> ProjectId {
    ProjectId::new(id).unwrap()
}

pub fn code(code: &str) -> PackingCode {
    PackingCode::new(code).unwrap()
}

/// Memory-backed configuration with fast retries and a fixed default date
pub fn test_config() -> PacklineConfig {
    parse_config(
        r#"
database_target = "memory"

[autosave]
debounce_ms = 500
max_retries = 2
retry_backoff_ms = [10, 20]

[reconcile]
max_attempts = 4
retry_backoff_ms = [1]

[session]
default_date = "2024-05-02"

[logging]
local_enabled = false
"#,
    )
    .unwrap()
}

/// Packing ledger that counts upserts and fails chosen lines
#[derive(Debug, Default)]
pub struct FlakyPackingLedger {
    pub inner: Arc<InMemoryLedger>,
    upserts: AtomicUsize,
    failing: Mutex<HashSet<LineId>>,

    /// Number of upcoming upserts (any line) to fail before succeeding
    fail_next: AtomicUsize,
    seen: Mutex<Vec<UpsertLineRequest>>,

    /// Deletes fail with a transport error while set
    failing_deletes: AtomicBool,

    /// Upserts wait on this until released
    gate: Mutex<Option<Arc<Notify>>>,
    upsert_started: Notify,
}

impl FlakyPackingLedger {
    pub fn new(inner: Arc<InMemoryLedger>) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// Every upsert of `line_id` fails with a transport error until healed
    pub fn fail_line(&self, line_id: LineId) {
        self.failing.lock().unwrap().insert(line_id);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
        self.failing_deletes.store(false, Ordering::SeqCst);
    }

    /// Every delete fails with a transport error until healed
    pub fn fail_deletes(&self) {
        self.failing_deletes.store(true, Ordering::SeqCst);
    }

    /// Upserts block once they have been received, until [`Self::release_upserts`]
    pub fn hold_upserts(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Let the held upsert through; later upserts no longer block
    pub fn release_upserts(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }

    /// Resolves once a held upsert has been received
    pub async fn upsert_started(&self) {
        self.upsert_started.notified().await;
    }

    fn delete_failure(&self) -> Result<()> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(PacklineError::Transport("timeout deleting rows".to_string()));
        }
        Ok(())
    }

    /// The next `n` upserts fail with a transport error
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Requests received so far, including failed ones
    pub fn requests(&self) -> Vec<UpsertLineRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn requests_for(&self, line_id: LineId) -> Vec<UpsertLineRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.line_id == line_id)
            .collect()
    }
}

#[async_trait]
impl PackingLedger for FlakyPackingLedger {
    async fn test_connection(&self) -> Result<()> {
        self.inner.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.inner.ensure_schema().await
    }

    async fn upsert_line(&self, request: &UpsertLineRequest) -> Result<UpsertLineResponse> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        let fail_next = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail_next || self.failing.lock().unwrap().contains(&request.line_id) {
            return Err(PacklineError::Transport(format!(
                "timeout writing line {}",
                request.line_id
            )));
        }

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.upsert_started.notify_one();
            gate.notified().await;
        }
        self.inner.upsert_line(request).await
    }

    async fn delete_line(&self, line_id: &LineId) -> Result<Option<LedgerLine>> {
        self.delete_failure()?;
        self.inner.delete_line(line_id).await
    }

    async fn delete_group(
        &self,
        packing_code: &PackingCode,
        pl_date: NaiveDate,
    ) -> Result<Vec<LedgerLine>> {
        self.delete_failure()?;
        self.inner.delete_group(packing_code, pl_date).await
    }

    async fn lines_for_project(&self, project_id: &ProjectId) -> Result<Vec<LedgerLine>> {
        self.inner.lines_for_project(project_id).await
    }

    async fn lines_for_date(&self, pl_date: NaiveDate) -> Result<Vec<LedgerLine>> {
        self.inner.lines_for_date(pl_date).await
    }
}

/// Inventory ledger whose commits lose the optimistic race a set number of times
///
/// Each lost race is simulated by a competing writer that commits first, bumping the
/// stored version.
#[derive(Debug, Default)]
pub struct ContendedInventoryLedger {
    pub inner: Arc<InMemoryLedger>,
    conflicts_left: AtomicUsize,
    commits: AtomicUsize,
}

impl ContendedInventoryLedger {
    pub fn new(inner: Arc<InMemoryLedger>, conflicts: usize) -> Self {
        Self {
            inner,
            conflicts_left: AtomicUsize::new(conflicts),
            commits: AtomicUsize::new(0),
        }
    }

    /// Commit attempts seen, including lost races
    pub fn commit_attempts(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryLedger for ContendedInventoryLedger {
    async fn load_inventory(&self, project_id: &ProjectId) -> Result<Option<ProjectInventory>> {
        self.inner.load_inventory(project_id).await
    }

    async fn save_inventory(&self, inventory: &ProjectInventory) -> Result<()> {
        self.inner.save_inventory(inventory).await
    }

    async fn list_inventories(&self) -> Result<Vec<ProjectInventory>> {
        self.inner.list_inventories().await
    }

    async fn commit_export(
        &self,
        project_id: &ProjectId,
        expected_version: u64,
        export_quantity: u64,
    ) -> Result<CommitOutcome> {
        self.commits.fetch_add(1, Ordering::SeqCst);

        let lose = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            // A competing writer rewrites the stored value and bumps the version
            if let Some(stored) = self.inner.load_inventory(project_id).await? {
                self.inner
                    .commit_export(project_id, stored.version, stored.export_quantity)
                    .await?;
            }
            return Ok(CommitOutcome::Conflict);
        }
        self.inner
            .commit_export(project_id, expected_version, export_quantity)
            .await
    }
}

/// Ledgers over one shared in-memory store, with a flaky packing side
pub fn flaky_ledgers() -> (Arc<InMemoryLedger>, Arc<FlakyPackingLedger>, Ledgers) {
    let store = Arc::new(InMemoryLedger::new());
    let packing = Arc::new(FlakyPackingLedger::new(store.clone()));
    let ledgers = Ledgers {
        packing: packing.clone(),
        inventory: store.clone(),
    };
    (store, packing, ledgers)
}

/// Seeds an inventory record where ordered and received quantities match
pub async fn seed_inventory(ledger: &InMemoryLedger, project_id: &str, entry: u64) {
    ledger
        .save_inventory(&ProjectInventory::new(project(project_id), entry, entry))
        .await
        .unwrap();
}
