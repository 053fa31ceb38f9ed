//! PostgreSQL adapter implementing the ledger traits

use crate::adapters::ledger::traits::{CommitOutcome, InventoryLedger, PackingLedger};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{to_i64, PostgreSQLInventory, PostgreSQLPackingLine};
use crate::domain::ids::{LineId, PackingCode, ProjectId};
use crate::domain::inventory::ProjectInventory;
use crate::domain::messages::{UpsertAction, UpsertLineRequest, UpsertLineResponse};
use crate::domain::packing::LedgerLine;
use crate::domain::{PacklineError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

const LINE_COLUMNS: &str = "line_id, packing_code, pl_date, logistic_company, product_name, sku, \
     packaging_method, packaging_count, box_count, quantity_per_box, export_quantity, \
     project_id, updated_at";

const INVENTORY_COLUMNS: &str =
    "project_id, quantity, entry_quantity, export_quantity, remain_quantity, version, updated_at";

/// PostgreSQL implementation of the packing and inventory ledgers
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new PostgreSQL adapter with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    fn rows_to_lines(rows: Vec<tokio_postgres::Row>) -> Result<Vec<LedgerLine>> {
        rows.iter()
            .map(|row| PostgreSQLPackingLine::from_row(row).to_domain())
            .collect()
    }
}

#[async_trait]
impl PackingLedger for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn upsert_line(&self, request: &UpsertLineRequest) -> Result<UpsertLineResponse> {
        // Keyed by line_id: force_insert only matters for logging, a row is never duplicated
        let upsert_query = r#"
            INSERT INTO packing_lines (
                line_id, packing_code, pl_date, logistic_company, product_name, sku,
                packaging_method, packaging_count, box_count, quantity_per_box,
                export_quantity, project_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            ON CONFLICT (line_id) DO UPDATE SET
                packing_code = EXCLUDED.packing_code,
                pl_date = EXCLUDED.pl_date,
                logistic_company = EXCLUDED.logistic_company,
                product_name = EXCLUDED.product_name,
                sku = EXCLUDED.sku,
                packaging_method = EXCLUDED.packaging_method,
                packaging_count = EXCLUDED.packaging_count,
                box_count = EXCLUDED.box_count,
                quantity_per_box = EXCLUDED.quantity_per_box,
                export_quantity = EXCLUDED.export_quantity,
                project_id = EXCLUDED.project_id,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
        "#;

        let line_id = *request.line_id.as_uuid();
        let packaging_method = i64::from(request.packaging_method);
        let packaging_count = i64::from(request.packaging_count);
        let box_count = i64::from(request.box_count);
        let quantity_per_box = to_i64(request.quantity_per_box, "quantity_per_box")?;
        let export_quantity = to_i64(request.export_quantity(), "export_quantity")?;
        let project_id = request.project_id.as_ref().map(|p| p.as_str());

        let rows = self
            .client
            .query(
                upsert_query,
                &[
                    &line_id,
                    &request.packing_code.as_str(),
                    &request.pl_date,
                    &request.logistic_company,
                    &request.product_name,
                    &request.sku,
                    &packaging_method,
                    &packaging_count,
                    &box_count,
                    &quantity_per_box,
                    &export_quantity,
                    &project_id,
                ],
            )
            .await?;

        let inserted: bool = rows
            .first()
            .map(|row| row.get("inserted"))
            .ok_or_else(|| PacklineError::Database("Upsert returned no row".to_string()))?;

        let action = if inserted {
            UpsertAction::Inserted
        } else {
            UpsertAction::Updated
        };

        tracing::debug!(
            line_id = %request.line_id,
            packing_code = %request.packing_code,
            force_insert = request.force_insert,
            action = %action,
            "Packing line upserted"
        );

        Ok(UpsertLineResponse {
            success: true,
            action,
            id: request.line_id,
        })
    }

    async fn delete_line(&self, line_id: &LineId) -> Result<Option<LedgerLine>> {
        let query = format!("DELETE FROM packing_lines WHERE line_id = $1 RETURNING {LINE_COLUMNS}");
        let rows = self.client.query(&query, &[line_id.as_uuid()]).await?;
        Ok(Self::rows_to_lines(rows)?.into_iter().next())
    }

    async fn delete_group(
        &self,
        packing_code: &PackingCode,
        pl_date: NaiveDate,
    ) -> Result<Vec<LedgerLine>> {
        let query = format!(
            "DELETE FROM packing_lines WHERE packing_code = $1 AND pl_date = $2 RETURNING {LINE_COLUMNS}"
        );
        let rows = self
            .client
            .query(&query, &[&packing_code.as_str(), &pl_date])
            .await?;
        Self::rows_to_lines(rows)
    }

    async fn lines_for_project(&self, project_id: &ProjectId) -> Result<Vec<LedgerLine>> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM packing_lines WHERE project_id = $1 ORDER BY packing_code, line_id"
        );
        let rows = self.client.query(&query, &[&project_id.as_str()]).await?;
        Self::rows_to_lines(rows)
    }

    async fn lines_for_date(&self, pl_date: NaiveDate) -> Result<Vec<LedgerLine>> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM packing_lines WHERE pl_date = $1 ORDER BY packing_code, line_id"
        );
        let rows = self.client.query(&query, &[&pl_date]).await?;
        Self::rows_to_lines(rows)
    }
}

#[async_trait]
impl InventoryLedger for PostgreSQLAdapter {
    async fn load_inventory(&self, project_id: &ProjectId) -> Result<Option<ProjectInventory>> {
        let query = format!("SELECT {INVENTORY_COLUMNS} FROM project_inventory WHERE project_id = $1");
        let rows = self.client.query(&query, &[&project_id.as_str()]).await?;

        rows.first()
            .map(|row| PostgreSQLInventory::from_row(row).to_domain())
            .transpose()
    }

    async fn save_inventory(&self, inventory: &ProjectInventory) -> Result<()> {
        let row = PostgreSQLInventory::from_domain(inventory)?;

        // Bumping the version invalidates any reconciliation that read the old entry quantity
        let upsert_query = r#"
            INSERT INTO project_inventory (
                project_id, quantity, entry_quantity, export_quantity, remain_quantity,
                version, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (project_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                entry_quantity = EXCLUDED.entry_quantity,
                export_quantity = EXCLUDED.export_quantity,
                remain_quantity = EXCLUDED.remain_quantity,
                version = project_inventory.version + 1,
                updated_at = NOW()
        "#;

        self.client
            .execute(
                upsert_query,
                &[
                    &row.project_id,
                    &row.quantity,
                    &row.entry_quantity,
                    &row.export_quantity,
                    &row.remain_quantity,
                    &row.version,
                ],
            )
            .await?;

        tracing::debug!(project_id = %inventory.project_id, "Project inventory saved");
        Ok(())
    }

    async fn list_inventories(&self) -> Result<Vec<ProjectInventory>> {
        let query = format!("SELECT {INVENTORY_COLUMNS} FROM project_inventory ORDER BY project_id");
        let rows = self.client.query(&query, &[]).await?;

        rows.iter()
            .map(|row| PostgreSQLInventory::from_row(row).to_domain())
            .collect()
    }

    async fn commit_export(
        &self,
        project_id: &ProjectId,
        expected_version: u64,
        export_quantity: u64,
    ) -> Result<CommitOutcome> {
        let export = to_i64(export_quantity, "export_quantity")?;
        let version = to_i64(expected_version, "version")?;

        let update_query = format!(
            r#"
            UPDATE project_inventory SET
                export_quantity = $2,
                remain_quantity = entry_quantity - $2,
                version = version + 1,
                updated_at = NOW()
            WHERE project_id = $1 AND version = $3 AND $2 <= entry_quantity
            RETURNING {INVENTORY_COLUMNS}
            "#
        );

        let rows = self
            .client
            .query(&update_query, &[&project_id.as_str(), &export, &version])
            .await?;

        if let Some(row) = rows.first() {
            let committed = PostgreSQLInventory::from_row(row).to_domain()?;
            return Ok(CommitOutcome::Committed(committed));
        }

        // Nothing updated: either the project is gone or another writer got there first
        match self.load_inventory(project_id).await? {
            Some(_) => Ok(CommitOutcome::Conflict),
            None => Err(PacklineError::NotFound(format!("project {project_id}"))),
        }
    }
}
