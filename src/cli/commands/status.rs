//! Status command implementation
//!
//! This module implements the `status` command for displaying project inventory
//! quantities.

use super::{load_or_report, open_ledgers, EXIT_FATAL, EXIT_OK};
use crate::domain::ProjectInventory;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter by project ID
    #[arg(long)]
    pub project: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking inventory status");

        println!("📊 Project Inventory");
        println!();

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let ledgers = match open_ledgers(&config, &[]).await {
            Ok(l) => l,
            Err(code) => return Ok(code),
        };

        let inventories = match ledgers.inventory.list_inventories().await {
            Ok(i) => i,
            Err(e) => {
                println!("❌ Failed to load project inventories");
                println!("   Error: {}", e);
                return Ok(EXIT_FATAL);
            }
        };

        if inventories.is_empty() {
            println!("No project inventories found.");
            return Ok(EXIT_OK);
        }

        let filtered: Vec<&ProjectInventory> = inventories
            .iter()
            .filter(|inv| match &self.project {
                Some(project) => inv.project_id.as_str() == project.trim(),
                None => true,
            })
            .collect();

        if filtered.is_empty() {
            println!("No projects match the specified filter.");
            return Ok(EXIT_OK);
        }

        println!("Found {} project(s):", filtered.len());
        println!();
        println!(
            "{:<24} {:>12} {:>12} {:>12} {:>12} {:<12} {:<20}",
            "Project ID", "Quantity", "Entry", "Export", "Remain", "State", "Updated"
        );
        println!("{}", "-".repeat(110));

        for inventory in filtered {
            let state = if !inventory.is_consistent() {
                "⚠️  Drift"
            } else if inventory.remain_quantity == 0 && inventory.entry_quantity > 0 {
                "📦 Shipped"
            } else {
                "✅ OK"
            };

            println!(
                "{:<24} {:>12} {:>12} {:>12} {:>12} {:<12} {:<20}",
                inventory.project_id.as_str(),
                inventory.quantity,
                inventory.entry_quantity,
                inventory.export_quantity,
                inventory.remain_quantity,
                state,
                inventory.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        println!();
        Ok(EXIT_OK)
    }
}
