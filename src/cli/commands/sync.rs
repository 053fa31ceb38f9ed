//! Sync command implementation
//!
//! This module implements the `sync` command: a packing list document is staged in an
//! editing session, auto-saved to the packing ledger, and every linked project is
//! reconciled.

use super::{
    exit_code_for, load_or_report, open_ledgers, EXIT_CONSTRAINT, EXIT_FATAL, EXIT_INTERRUPTED,
    EXIT_OK, EXIT_PARTIAL,
};
use crate::core::session::{ImportSummary, PackingSession, SessionReport};
use crate::domain::{PacklineError, PackingListDocument, ProjectId};
use chrono::NaiveDate;
use clap::Args;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Packing list document (JSON)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Packing list date; overrides dates carried by the document
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Dry run mode - work on an in-memory copy of the ledger
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Starting sync command");

        let mut config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        let document = match std::fs::read_to_string(&self.file)
            .map_err(PacklineError::from)
            .and_then(|json| PackingListDocument::from_json(&json))
        {
            Ok(d) => d,
            Err(e) => {
                println!("❌ Failed to read packing list {}", self.file.display());
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No data will be written to the ledger");
            println!();
        }

        let projects = document_projects(&document);
        let ledgers = match open_ledgers(&config, &projects).await {
            Ok(l) => l,
            Err(code) => return Ok(code),
        };
        if let Err(e) = ledgers.packing.ensure_schema().await {
            println!("❌ Failed to prepare the ledger schema");
            println!("   Error: {e}");
            return Ok(exit_code_for(&e));
        }

        let session = PackingSession::new(ledgers, &config);

        println!(
            "🚀 Staging {} line(s) in {} group(s)...",
            document.line_count(),
            document.groups.len()
        );
        let (import, report) =
            stage_and_save(&session, &document, self.date, &shutdown_signal).await;

        println!();
        println!("📊 Sync Summary:");
        println!("  Groups staged: {}", import.groups);
        println!("  Lines staged: {}", import.lines);
        println!("  Lines persisted: {}", report.sync.persisted());
        println!("    Inserted: {}", report.sync.inserted);
        println!("    Updated: {}", report.sync.updated);
        println!("  Lines failed: {}", report.sync.failed);
        println!("  Lines held back (missing name or code): {}", report.sync.skipped);
        println!();

        if !import.rejected.is_empty() {
            println!("⚠️  Rejected entries:");
            for reason in &import.rejected {
                println!("  - {reason}");
            }
            println!();
        }

        if !report.sync.failures.is_empty() {
            println!(
                "⚠️  {} of {} line(s) failed to save:",
                report.sync.failed, report.sync.attempted
            );
            for failure in report.sync.failures.iter().take(10) {
                println!(
                    "  - {} ({}): {}",
                    failure.line_id,
                    failure.packing_code.as_deref().unwrap_or("-"),
                    failure.message
                );
            }
            if report.sync.failures.len() > 10 {
                println!("  ... and {} more", report.sync.failures.len() - 10);
            }
            println!();
        }

        let mut constraint_violated = false;
        if !report.reconciliations.is_empty() {
            println!("📦 Reconciliation:");
            for (project_id, outcome) in &report.reconciliations {
                match outcome {
                    Ok(inventory) => println!(
                        "  ✅ {}: export {} / entry {} (remain {})",
                        project_id,
                        inventory.export_quantity,
                        inventory.entry_quantity,
                        inventory.remain_quantity
                    ),
                    Err(PacklineError::ConstraintViolation(v)) => {
                        constraint_violated = true;
                        println!(
                            "  ❌ {}: export {} exceeds entry {} by {}",
                            project_id,
                            v.candidate_export_quantity,
                            v.entry_quantity,
                            v.difference
                        );
                    }
                    Err(e) => println!("  ❌ {project_id}: {e}"),
                }
            }
            println!();
        }

        let exit_code = if import.interrupted {
            println!("⚠️  Sync interrupted. Staged lines were saved.");
            tracing::info!("Sync interrupted by user signal");
            EXIT_INTERRUPTED
        } else if constraint_violated {
            println!("❌ Export quantity would exceed received quantity");
            EXIT_CONSTRAINT
        } else if report.is_successful() && import.rejected.is_empty() {
            println!("✅ Sync completed successfully!");
            EXIT_OK
        } else {
            println!("⚠️  Sync completed with failures");
            EXIT_PARTIAL
        };

        Ok(exit_code)
    }
}

/// Stage a document and persist it in a single pass
///
/// No debounce worker runs here, so the returned report accounts for every line the
/// command persisted. Staged lines are flushed even when the import was interrupted.
async fn stage_and_save(
    session: &PackingSession,
    document: &PackingListDocument,
    date: Option<NaiveDate>,
    shutdown_signal: &watch::Receiver<bool>,
) -> (ImportSummary, SessionReport) {
    let import = session
        .import_document(document, date, Some(shutdown_signal))
        .await;
    let report = session.save_all(date).await;
    (import, report)
}

/// Projects referenced anywhere in a document
fn document_projects(document: &PackingListDocument) -> Vec<ProjectId> {
    let mut projects = BTreeSet::new();
    for group in &document.groups {
        projects.extend(group.project_id.as_deref().and_then(|p| ProjectId::new(p).ok()));
        for line in &group.lines {
            projects.extend(line.project_id.as_deref().and_then(|p| ProjectId::new(p).ok()));
        }
    }
    projects.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ledger::Ledgers;
    use crate::adapters::memory::InMemoryLedger;
    use crate::config::parse_config;
    use crate::domain::ProjectInventory;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stage_and_save_counts_every_persisted_line() {
        let ledger = Arc::new(InMemoryLedger::seeded(
            vec![ProjectInventory::new(ProjectId::new("P-1").unwrap(), 1000, 1000)],
            vec![],
        ));
        let config = parse_config(
            "database_target = \"memory\"\n[session]\ndefault_date = \"2024-05-02\"\n",
        )
        .unwrap();
        let session = PackingSession::new(Ledgers::in_memory(ledger.clone()), &config);
        let document = PackingListDocument::from_json(
            r#"{"groups": [
                {"packingCode": "PK-1", "projectId": "P-1", "boxCount": 2,
                 "lines": [{"productName": "A", "packagingMethod": 1, "packagingCount": 1},
                           {"productName": "B", "packagingMethod": 2, "packagingCount": 1}]},
                {"packingCode": "PK-2", "projectId": "P-1", "boxCount": 1,
                 "lines": [{"productName": "C", "packagingMethod": 3, "packagingCount": 1}]}
            ]}"#,
        )
        .unwrap();
        let (_tx, rx) = watch::channel(false);

        let (import, report) = stage_and_save(&session, &document, None, &rx).await;
        assert_eq!(import.lines, 3);
        assert_eq!(report.sync.persisted(), 3);
        assert_eq!(report.sync.inserted, 3);
        assert_eq!(ledger.line_count().await, 3);
        assert_eq!(report.reconciled().next().unwrap().export_quantity, 9);
    }

    #[test]
    fn test_document_projects_deduplicates() {
        let document = PackingListDocument::from_json(
            r#"{"groups": [
                {"packingCode": "PK-1", "projectId": "P-1",
                 "lines": [{"productName": "A", "projectId": "P-2"}, {"productName": "B", "projectId": " "}]},
                {"packingCode": "PK-2", "projectId": "P-1"}
            ]}"#,
        )
        .unwrap();
        let projects = document_projects(&document);
        assert_eq!(
            projects,
            vec![ProjectId::new("P-1").unwrap(), ProjectId::new("P-2").unwrap()]
        );
    }
}
