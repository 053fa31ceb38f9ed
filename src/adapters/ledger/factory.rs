//! Ledger factory
//!
//! Creates ledger implementations based on configuration.

use crate::adapters::ledger::traits::{InventoryLedger, PackingLedger};
use crate::adapters::memory::InMemoryLedger;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{DatabaseTarget, PacklineConfig};
use crate::domain::{PacklineError, Result};
use std::sync::Arc;

/// Packing and inventory ledgers backed by the same store
#[derive(Clone)]
pub struct Ledgers {
    pub packing: Arc<dyn PackingLedger + Send + Sync>,
    pub inventory: Arc<dyn InventoryLedger + Send + Sync>,
}

impl Ledgers {
    /// Both ledgers served by one in-memory store
    pub fn in_memory(ledger: Arc<InMemoryLedger>) -> Self {
        Self {
            packing: ledger.clone() as Arc<dyn PackingLedger + Send + Sync>,
            inventory: ledger as Arc<dyn InventoryLedger + Send + Sync>,
        }
    }
}

/// Create both ledgers from the configuration
///
/// For PostgreSQL, both trait objects share one connection pool.
///
/// # Errors
///
/// Returns an error if the configured backend cannot be created.
pub async fn create_ledgers(config: &PacklineConfig) -> Result<Ledgers> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                PacklineError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL ledgers");
            let client = Arc::new(PostgreSQLClient::new(pg_config.clone()).await?);
            let adapter = Arc::new(PostgreSQLAdapter::new_with_arc(client));

            Ok(Ledgers {
                packing: adapter.clone() as Arc<dyn PackingLedger + Send + Sync>,
                inventory: adapter as Arc<dyn InventoryLedger + Send + Sync>,
            })
        }
        DatabaseTarget::Memory => {
            tracing::info!("Creating in-memory ledgers");
            Ok(Ledgers::in_memory(Arc::new(InMemoryLedger::new())))
        }
    }
}

/// Create an in-memory copy of the configured store for a dry run
///
/// Inventories and the lines of `projects` are copied so reconciliation sees real
/// numbers; nothing is ever written back.
///
/// # Errors
///
/// Returns an error if the configured store cannot be read.
pub async fn create_dry_run_ledgers(
    config: &PacklineConfig,
    projects: &[crate::domain::ProjectId],
) -> Result<Ledgers> {
    let source = create_ledgers(config).await?;

    let inventories = source.inventory.list_inventories().await?;
    let mut lines = Vec::new();
    for project_id in projects {
        lines.extend(source.packing.lines_for_project(project_id).await?);
    }

    tracing::info!(
        inventories = inventories.len(),
        lines = lines.len(),
        "DRY RUN: working on an in-memory copy of the ledger"
    );

    Ok(Ledgers::in_memory(Arc::new(InMemoryLedger::seeded(
        inventories,
        lines,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[tokio::test]
    async fn test_create_memory_ledgers() {
        let config = parse_config("database_target = \"memory\"").unwrap();
        let ledgers = create_ledgers(&config).await.unwrap();
        assert!(ledgers.packing.test_connection().await.is_ok());
        assert!(ledgers.inventory.list_inventories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_postgresql_without_section_fails() {
        let mut config = parse_config("database_target = \"memory\"").unwrap();
        config.database_target = DatabaseTarget::PostgreSQL;
        let result = create_ledgers(&config).await;
        assert!(matches!(result, Err(PacklineError::Configuration(_))));
    }
}
