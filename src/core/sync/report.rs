//! Synchronization pass reporting

use super::status::SaveStatus;
use crate::domain::{LineFailureDetail, LineId, UpsertAction};
use std::time::Duration;

/// Result of one synchronization pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Upserts issued
    pub attempted: usize,

    /// Upserts that created a ledger row
    pub inserted: usize,

    /// Upserts that updated an existing ledger row
    pub updated: usize,

    /// Upserts that failed after retries
    pub failed: usize,

    /// Dirty lines held back because a required field is missing
    pub skipped: usize,

    /// Lines written during the pass
    pub persisted_lines: Vec<LineId>,

    /// Per-line failures
    pub failures: Vec<LineFailureDetail>,

    pub duration: Duration,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a persisted line
    pub fn add_persisted(&mut self, line_id: LineId, action: UpsertAction) {
        match action {
            UpsertAction::Inserted => self.inserted += 1,
            UpsertAction::Updated => self.updated += 1,
        }
        self.persisted_lines.push(line_id);
    }

    /// Record a failed line
    pub fn add_failure(&mut self, failure: LineFailureDetail) {
        self.failed += 1;
        self.failures.push(failure);
    }

    /// Record a line held back by the required-field gate
    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn persisted(&self) -> usize {
        self.inserted + self.updated
    }

    /// No line failed
    pub fn is_successful(&self) -> bool {
        self.failed == 0
    }

    /// The pass sent nothing
    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }

    /// Status to show for this pass, `None` when nothing was sent
    pub fn status(&self) -> Option<SaveStatus> {
        if self.is_empty() {
            None
        } else if self.is_successful() {
            Some(SaveStatus::Success)
        } else {
            Some(SaveStatus::Error {
                failed: self.failed,
                total: self.attempted,
            })
        }
    }

    /// Merge another pass into this one
    pub fn merge(&mut self, other: SyncReport) {
        self.attempted += other.attempted;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.persisted_lines.extend(other.persisted_lines);
        self.failures.extend(other.failures);
        self.duration += other.duration;
    }

    /// Log the report
    pub fn log_summary(&self) {
        crate::log_sync_pass!(
            self.attempted,
            self.persisted(),
            self.failed,
            self.skipped,
            self.duration
        );

        for failure in &self.failures {
            tracing::warn!(
                line_id = %failure.line_id,
                packing_code = ?failure.packing_code,
                retryable = failure.retryable,
                message = %failure.message,
                "Line failed to persist"
            );
        }
    }
}
