//! Delete command implementations
//!
//! This module implements `delete-line` and `delete-group`. Rows are removed from the
//! packing ledger first; projects referenced by the removed rows are reconciled after.

use super::{exit_code_for, load_or_report, open_ledgers, EXIT_CONFIG, EXIT_CONSTRAINT, EXIT_OK};
use crate::core::session::{DeletionReport, PackingSession};
use crate::domain::{LineId, PackingCode, PacklineError};
use chrono::NaiveDate;
use clap::Args;

/// Arguments for the delete-line command
#[derive(Args, Debug)]
pub struct DeleteLineArgs {
    /// Line to delete
    #[arg(long)]
    pub line_id: String,
}

impl DeleteLineArgs {
    /// Execute the delete-line command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(line_id = %self.line_id, "Starting delete-line command");

        let line_id: LineId = match self.line_id.parse() {
            Ok(id) => id,
            Err(e) => {
                println!("❌ Invalid line id: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let session = match open_session(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let report = match session.delete_line(&line_id).await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to delete line {line_id}");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if report.deleted.is_empty() {
            println!("ℹ️  No ledger row for line {line_id}");
        } else {
            println!("🗑️  Deleted line {line_id}");
        }
        Ok(print_reconciliations(&report))
    }
}

/// Arguments for the delete-group command
#[derive(Args, Debug)]
pub struct DeleteGroupArgs {
    /// Packing code of the group
    #[arg(long)]
    pub packing_code: String,

    /// Packing list date of the group
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: NaiveDate,
}

impl DeleteGroupArgs {
    /// Execute the delete-group command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(
            packing_code = %self.packing_code,
            pl_date = %self.date,
            "Starting delete-group command"
        );

        let packing_code = match PackingCode::new(&self.packing_code) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Invalid packing code: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let session = match open_session(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let report = match session.delete_group(&packing_code, self.date).await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to delete packing code {packing_code}");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!(
            "🗑️  Deleted {} line(s) of {} on {}",
            report.group_response().deleted_count,
            packing_code,
            self.date
        );
        if report.reconciliations.is_empty() {
            println!("  No linked project, reconciliation skipped");
        }
        Ok(print_reconciliations(&report))
    }
}

async fn open_session(config_path: &str) -> Result<PackingSession, i32> {
    let config = load_or_report(config_path)?;
    if config.application.dry_run {
        println!("🔍 DRY RUN MODE - No data will be written to the ledger");
    }
    let ledgers = open_ledgers(&config, &[]).await?;
    Ok(PackingSession::new(ledgers, &config))
}

/// Prints reconciliation outcomes and returns the exit code
fn print_reconciliations(report: &DeletionReport) -> i32 {
    let mut exit_code = EXIT_OK;
    for (project_id, outcome) in &report.reconciliations {
        match outcome {
            Ok(inventory) => println!(
                "  ✅ {}: export {} / remain {}",
                project_id, inventory.export_quantity, inventory.remain_quantity
            ),
            Err(PacklineError::ConstraintViolation(v)) => {
                println!("  ❌ {project_id}: {v}");
                exit_code = EXIT_CONSTRAINT;
            }
            Err(e) => {
                println!("  ❌ {project_id}: {e}");
                if exit_code == EXIT_OK {
                    exit_code = exit_code_for(e);
                }
            }
        }
    }
    exit_code
}
