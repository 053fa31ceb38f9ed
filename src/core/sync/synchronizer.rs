//! Auto-save synchronizer
//!
//! Owns the session's [`PackingLineStore`] and keeps the packing ledger in step with it.
//! Every accepted action marks the lines it touched as dirty; a debounced pass then
//! upserts the dirty lines concurrently, one request per line. Lines that fail stay
//! dirty and are resent by the next pass.

use super::report::SyncReport;
use super::status::{SaveStatus, StatusBoard};
use crate::adapters::ledger::PackingLedger;
use crate::config::AutoSaveConfig;
use crate::core::store::{ChangeSet, PackingLineStore, StoreAction};
use crate::domain::{
    GroupId, LineFailureDetail, LineId, PackingCode, PacklineError, Result, UpsertLineRequest,
    UpsertLineResponse,
};
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, MutexGuard, Notify};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct SyncState {
    store: PackingLineStore,

    /// Lines whose ledger row is stale or missing
    dirty: BTreeSet<LineId>,

    /// Lines never written yet; their next upsert carries `force_insert`
    fresh: BTreeSet<LineId>,

    /// Date each line's ledger row was last written with
    written: BTreeMap<LineId, NaiveDate>,

    /// Date input shown with the most recent action
    date_input: Option<NaiveDate>,
}

/// Debounced, deduplicated persistence of staged lines
pub struct AutoSaveSynchronizer {
    ledger: Arc<dyn PackingLedger + Send + Sync>,
    config: AutoSaveConfig,
    default_date: NaiveDate,
    state: Mutex<SyncState>,

    /// Held for the duration of a pass
    pass: Mutex<()>,
    notify: Notify,
    status: StatusBoard,
}

impl AutoSaveSynchronizer {
    /// Create a synchronizer over an empty store
    ///
    /// `default_date` is the last resort when neither the date input, the line nor its
    /// group carry a date.
    pub fn new(
        ledger: Arc<dyn PackingLedger + Send + Sync>,
        config: AutoSaveConfig,
        default_date: NaiveDate,
    ) -> Self {
        Self {
            ledger,
            config,
            default_date,
            state: Mutex::new(SyncState::default()),
            pass: Mutex::new(()),
            notify: Notify::new(),
            status: StatusBoard::new(),
        }
    }

    /// Apply an action to the store and schedule a pass for the lines it touched
    ///
    /// `date_input` is the value of the date control when the action was made; it
    /// outranks any date stored on lines or groups.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the action is rejected; the store is unchanged.
    pub async fn submit(
        &self,
        action: StoreAction,
        date_input: Option<NaiveDate>,
    ) -> Result<ChangeSet> {
        let changes = self.stage(action, date_input).await?;
        if !changes.touched.is_empty() {
            self.notify.notify_one();
        }
        Ok(changes)
    }

    /// Wait for an in-flight pass, then keep new passes out until the guard drops
    ///
    /// Removals hold this while deleting ledger rows and unstaging lines, so no upsert
    /// of a removed line can land after its row is deleted.
    pub async fn hold_passes(&self) -> MutexGuard<'_, ()> {
        self.pass.lock().await
    }

    async fn stage(&self, action: StoreAction, date_input: Option<NaiveDate>) -> Result<ChangeSet> {
        let name = action.name();
        let mut state = self.state.lock().await;
        let transition = state.store.apply(action)?;

        state.store = transition.store;
        let changes = transition.changes;
        state.dirty.extend(changes.touched.iter().copied());
        state.fresh.extend(changes.created.iter().copied());
        for line in &changes.removed {
            state.dirty.remove(&line.id);
            state.fresh.remove(&line.id);
            state.written.remove(&line.id);
        }
        state.date_input = date_input;

        tracing::debug!(
            action = name,
            touched = changes.touched.len(),
            removed = changes.removed.len(),
            structural = changes.structural,
            "Store action applied"
        );
        Ok(changes)
    }

    /// Run one synchronization pass now
    ///
    /// `date_input` overrides the date recorded with the last action when given.
    /// Failures are reported per line in the returned [`SyncReport`]; they never abort
    /// the other lines of the pass.
    pub async fn flush(&self, date_input: Option<NaiveDate>) -> SyncReport {
        let _pass = self.pass.lock().await;
        let start = Instant::now();
        let mut report = SyncReport::new();

        let requests = {
            let mut state = self.state.lock().await;
            if date_input.is_some() {
                state.date_input = date_input;
            }
            self.take_requests(&mut state, &mut report)
        };

        if requests.is_empty() {
            return report.with_duration(start.elapsed());
        }

        report.attempted = requests.len();
        self.status.set(SaveStatus::Saving);

        let outcomes = join_all(requests.into_iter().map(|request| async move {
            let result = self.upsert_with_retry(&request).await;
            (request, result)
        }))
        .await;

        {
            let mut state = self.state.lock().await;
            for (request, result) in outcomes {
                match result {
                    Ok(response) => {
                        state.fresh.remove(&request.line_id);
                        if state.store.line(&request.line_id).is_some() {
                            state.written.insert(request.line_id, request.pl_date);
                        }
                        report.add_persisted(request.line_id, response.action);
                    }
                    Err(err) => {
                        if state.store.line(&request.line_id).is_some() {
                            state.dirty.insert(request.line_id);
                        }
                        let mut failure =
                            LineFailureDetail::new(request.line_id.to_string(), err.to_string())
                                .with_packing_code(request.packing_code.as_str());
                        if err.is_transient() {
                            failure = failure.retryable();
                        }
                        report.add_failure(failure);
                    }
                }
            }

            if !report.persisted_lines.is_empty() {
                let action = StoreAction::MarkPersisted {
                    line_ids: report.persisted_lines.clone(),
                };
                match state.store.apply(action) {
                    Ok(transition) => state.store = transition.store,
                    Err(e) => {
                        crate::log_error_with_context!(e, "Failed to mark lines persisted");
                    }
                }
            }
        }

        let report = report.with_duration(start.elapsed());
        report.log_summary();

        match report.status() {
            Some(status @ SaveStatus::Success) => {
                self.status.flash(status, self.config.success_display())
            }
            Some(status) => self.status.flash(status, self.config.error_display()),
            None => {}
        }

        report
    }

    /// Builds one request per dirty line that passes the required-field gate
    ///
    /// Eligible lines leave the dirty set; gated lines stay in it.
    fn take_requests(
        &self,
        state: &mut SyncState,
        report: &mut SyncReport,
    ) -> Vec<UpsertLineRequest> {
        let mut requests = Vec::new();
        let mut sent = Vec::new();

        for line_id in state.store.line_ids() {
            if !state.dirty.contains(&line_id) {
                continue;
            }
            let (Some(line), Some(group)) =
                (state.store.line(&line_id), state.store.group_of(&line_id))
            else {
                continue;
            };

            let packing_code = match &group.packing_code {
                Some(code) if line.has_product_name() => code.clone(),
                _ => {
                    tracing::trace!(line_id = %line_id, "Line held back: required field missing");
                    report.add_skipped();
                    continue;
                }
            };

            let pl_date = state
                .date_input
                .or(line.pl_date)
                .or(group.pl_date)
                .unwrap_or(self.default_date);

            requests.push(UpsertLineRequest {
                line_id,
                packing_code,
                pl_date,
                logistic_company: group.logistic_company.clone(),
                product_name: line.product_name.trim().to_string(),
                sku: line.sku.clone(),
                packaging_method: line.packaging_method,
                packaging_count: line.packaging_count,
                box_count: line.box_count,
                quantity_per_box: line.quantity_per_box(),
                force_insert: state.fresh.contains(&line_id),
                project_id: line.project_id.clone(),
            });
            sent.push(line_id);
        }

        // Dirty ids no longer in the store have nothing left to send
        let live: BTreeSet<LineId> = state.store.line_ids().into_iter().collect();
        state.dirty.retain(|id| live.contains(id));
        for line_id in &sent {
            state.dirty.remove(line_id);
        }

        requests
    }

    async fn upsert_with_retry(&self, request: &UpsertLineRequest) -> Result<UpsertLineResponse> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            match self.ledger.upsert_line(request).await {
                Ok(response) if response.success => {
                    tracing::debug!(
                        line_id = %request.line_id,
                        action = %response.action,
                        force_insert = request.force_insert,
                        "Line persisted"
                    );
                    return Ok(response);
                }
                Ok(_) => {
                    return Err(PacklineError::Database(format!(
                        "ledger rejected line {}",
                        request.line_id
                    )));
                }
                Err(e) if e.is_transient() && attempt < max_retries => {
                    crate::log_retry_attempt!(attempt + 1, max_retries, e);
                    tokio::time::sleep(self.config.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Spawn the debounce worker
    ///
    /// Each edit restarts the quiet period; once it elapses a pass runs. When
    /// `shutdown` flips (or its sender is dropped) staged lines are flushed and the
    /// worker exits.
    pub fn spawn_worker(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_worker(shutdown).await })
    }

    async fn run_worker(&self, mut shutdown: watch::Receiver<bool>) {
        let debounce = self.config.debounce();
        tracing::debug!(debounce_ms = debounce.as_millis() as u64, "Auto-save worker started");

        'worker: while !*shutdown.borrow() {
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = shutdown.changed() => break 'worker,
            }

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(debounce) => break,
                    _ = self.notify.notified() => continue,
                    _ = shutdown.changed() => break 'worker,
                }
            }

            self.flush(None).await;
        }

        if self.pending_count().await > 0 {
            tracing::info!("Flushing staged lines before shutdown");
            self.flush(None).await;
        }
        tracing::debug!("Auto-save worker stopped");
    }

    /// Copy of the current store
    pub async fn snapshot(&self) -> PackingLineStore {
        self.state.lock().await.store.clone()
    }

    /// Staged group of `packing_code` whose rows belong to `pl_date`, with its line ids
    ///
    /// A group matches when its own date, a date carried on one of its lines, or the
    /// date one of its lines was last written with equals `pl_date`.
    pub async fn staged_group(
        &self,
        packing_code: &PackingCode,
        pl_date: NaiveDate,
    ) -> Option<(GroupId, Vec<LineId>)> {
        let state = self.state.lock().await;
        let found = state
            .store
            .groups()
            .filter(|g| g.packing_code.as_ref() == Some(packing_code))
            .find_map(|group| {
                let lines = state.store.lines_of(&group.id);
                let matches = group.pl_date.unwrap_or(self.default_date) == pl_date
                    || lines.iter().any(|line| {
                        line.pl_date == Some(pl_date)
                            || state.written.get(&line.id) == Some(&pl_date)
                    });
                matches.then(|| (group.id, lines.iter().map(|line| line.id).collect()))
            });
        found
    }

    /// Date the line's ledger row was last written with
    pub async fn written_date(&self, line_id: &LineId) -> Option<NaiveDate> {
        self.state.lock().await.written.get(line_id).copied()
    }

    /// Dirty lines, including those held back by the required-field gate
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.dirty.len()
    }

    pub async fn is_pending(&self, line_id: &LineId) -> bool {
        self.state.lock().await.dirty.contains(line_id)
    }

    pub fn status(&self) -> SaveStatus {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    pub fn default_date(&self) -> NaiveDate {
        self.default_date
    }
}
