//! Reconcile command implementation
//!
//! This module implements the `reconcile` command, which recomputes a project's export
//! quantity from the packing ledger and commits it to the inventory ledger.

use super::{exit_code_for, load_or_report, open_ledgers, EXIT_CONFIG, EXIT_CONSTRAINT, EXIT_OK};
use crate::core::reconcile::ExportReconciler;
use crate::domain::{PacklineError, ProjectId, ReconcileResponse};
use clap::Args;

/// Arguments for the reconcile command
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Project to reconcile
    #[arg(short, long)]
    pub project: String,

    /// Print the response body as JSON
    #[arg(long)]
    pub json: bool,

    /// Dry run mode - compute without committing to the ledger
    #[arg(long)]
    pub dry_run: bool,
}

impl ReconcileArgs {
    /// Execute the reconcile command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(project_id = %self.project, "Starting reconcile command");

        let project_id = match ProjectId::new(&self.project) {
            Ok(p) => p,
            Err(e) => {
                println!("❌ Invalid project id: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let mut config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        if self.dry_run {
            config.application.dry_run = true;
        }

        let ledgers = match open_ledgers(&config, std::slice::from_ref(&project_id)).await {
            Ok(l) => l,
            Err(code) => return Ok(code),
        };
        let reconciler =
            ExportReconciler::new(ledgers.packing, ledgers.inventory, config.reconcile.clone());

        let outcome = reconciler.reconcile(&project_id).await;

        if self.json {
            let response = match &outcome {
                Ok(inventory) => {
                    ReconcileResponse::success(inventory.export_quantity, inventory.remain_quantity)
                }
                Err(e) => ReconcileResponse::failure(e),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        match outcome {
            Ok(inventory) => {
                if !self.json {
                    println!("✅ Project {project_id} reconciled");
                    println!("  Quantity: {}", inventory.quantity);
                    println!("  Entry Quantity: {}", inventory.entry_quantity);
                    println!("  Export Quantity: {}", inventory.export_quantity);
                    println!("  Remain Quantity: {}", inventory.remain_quantity);
                }
                Ok(EXIT_OK)
            }
            Err(PacklineError::ConstraintViolation(v)) => {
                if !self.json {
                    println!("❌ Reconciliation rejected for project {project_id}");
                    println!("  Candidate Export Quantity: {}", v.candidate_export_quantity);
                    println!("  Entry Quantity: {}", v.entry_quantity);
                    println!("  Difference: {}", v.difference);
                    println!();
                    println!("Reduce packaging quantities or record more received units, then retry.");
                }
                Ok(EXIT_CONSTRAINT)
            }
            Err(e) => {
                crate::log_error_with_context!(e, "Reconciliation failed");
                if !self.json {
                    println!("❌ Reconciliation failed");
                    println!("   Error: {e}");
                }
                Ok(exit_code_for(&e))
            }
        }
    }
}
