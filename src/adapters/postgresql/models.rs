//! PostgreSQL row models
//!
//! Row structs mirror the `packing_lines` and `project_inventory` tables. Integer
//! columns are `BIGINT`, so counts cross the boundary as `i64`.

use crate::domain::ids::{LineId, PackingCode, ProjectId};
use crate::domain::inventory::ProjectInventory;
use crate::domain::packing::LedgerLine;
use crate::domain::{PacklineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tokio_postgres::Row;
use uuid::Uuid;

/// Row of the `packing_lines` table
#[derive(Debug, Clone)]
pub struct PostgreSQLPackingLine {
    pub line_id: Uuid,
    pub packing_code: String,
    pub pl_date: NaiveDate,
    pub logistic_company: Option<String>,
    pub product_name: String,
    pub sku: String,
    pub packaging_method: i64,
    pub packaging_count: i64,
    pub box_count: i64,
    pub quantity_per_box: i64,
    pub export_quantity: i64,
    pub project_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PostgreSQLPackingLine {
    pub fn from_row(row: &Row) -> Self {
        Self {
            line_id: row.get("line_id"),
            packing_code: row.get("packing_code"),
            pl_date: row.get("pl_date"),
            logistic_company: row.get("logistic_company"),
            product_name: row.get("product_name"),
            sku: row.get("sku"),
            packaging_method: row.get("packaging_method"),
            packaging_count: row.get("packaging_count"),
            box_count: row.get("box_count"),
            quantity_per_box: row.get("quantity_per_box"),
            export_quantity: row.get("export_quantity"),
            project_id: row.get("project_id"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Convert to the domain row
    ///
    /// # Errors
    ///
    /// Returns a `Database` error if a stored value violates a domain constraint
    /// (negative count, blank packing code).
    pub fn to_domain(self) -> Result<LedgerLine> {
        let packing_code = PackingCode::new(self.packing_code).map_err(PacklineError::Database)?;
        let project_id = self
            .project_id
            .filter(|p| !p.trim().is_empty())
            .map(ProjectId::new)
            .transpose()
            .map_err(PacklineError::Database)?;

        Ok(LedgerLine {
            line_id: LineId::from_uuid(self.line_id),
            packing_code,
            pl_date: self.pl_date,
            logistic_company: self.logistic_company,
            product_name: self.product_name,
            sku: self.sku,
            packaging_method: to_u32(self.packaging_method, "packaging_method")?,
            packaging_count: to_u32(self.packaging_count, "packaging_count")?,
            box_count: to_u32(self.box_count, "box_count")?,
            quantity_per_box: to_u64(self.quantity_per_box, "quantity_per_box")?,
            export_quantity: to_u64(self.export_quantity, "export_quantity")?,
            project_id,
            updated_at: self.updated_at,
        })
    }
}

/// Row of the `project_inventory` table
#[derive(Debug, Clone)]
pub struct PostgreSQLInventory {
    pub project_id: String,
    pub quantity: i64,
    pub entry_quantity: i64,
    pub export_quantity: i64,
    pub remain_quantity: i64,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl PostgreSQLInventory {
    pub fn from_row(row: &Row) -> Self {
        Self {
            project_id: row.get("project_id"),
            quantity: row.get("quantity"),
            entry_quantity: row.get("entry_quantity"),
            export_quantity: row.get("export_quantity"),
            remain_quantity: row.get("remain_quantity"),
            version: row.get("version"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Convert from the domain record
    pub fn from_domain(inventory: &ProjectInventory) -> Result<Self> {
        Ok(Self {
            project_id: inventory.project_id.to_string(),
            quantity: to_i64(inventory.quantity, "quantity")?,
            entry_quantity: to_i64(inventory.entry_quantity, "entry_quantity")?,
            export_quantity: to_i64(inventory.export_quantity, "export_quantity")?,
            remain_quantity: to_i64(inventory.remain_quantity, "remain_quantity")?,
            version: to_i64(inventory.version, "version")?,
            updated_at: inventory.updated_at,
        })
    }

    /// Convert to the domain record
    pub fn to_domain(self) -> Result<ProjectInventory> {
        Ok(ProjectInventory {
            project_id: ProjectId::new(self.project_id).map_err(PacklineError::Database)?,
            quantity: to_u64(self.quantity, "quantity")?,
            entry_quantity: to_u64(self.entry_quantity, "entry_quantity")?,
            export_quantity: to_u64(self.export_quantity, "export_quantity")?,
            remain_quantity: to_u64(self.remain_quantity, "remain_quantity")?,
            version: to_u64(self.version, "version")?,
            updated_at: self.updated_at,
        })
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| PacklineError::Database(format!("{column} out of range: {value}")))
}

fn to_u64(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| PacklineError::Database(format!("{column} out of range: {value}")))
}

pub(crate) fn to_i64(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| PacklineError::Validation(format!("{column} too large to store: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_row() -> PostgreSQLPackingLine {
        PostgreSQLPackingLine {
            line_id: Uuid::new_v4(),
            packing_code: "PK-001".to_string(),
            pl_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            logistic_company: Some("DHL".to_string()),
            product_name: "Hinge".to_string(),
            sku: "H-1".to_string(),
            packaging_method: 5,
            packaging_count: 2,
            box_count: 10,
            quantity_per_box: 10,
            export_quantity: 100,
            project_id: Some("P-1".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_line_to_domain() {
        let line = line_row().to_domain().unwrap();
        assert_eq!(line.packing_code.as_str(), "PK-001");
        assert_eq!(line.export_quantity, 100);
        assert_eq!(line.project_id.unwrap().as_str(), "P-1");
    }

    #[test]
    fn test_blank_project_is_none() {
        let mut row = line_row();
        row.project_id = Some("  ".to_string());
        assert!(row.to_domain().unwrap().project_id.is_none());
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut row = line_row();
        row.box_count = -1;
        assert!(matches!(row.to_domain(), Err(PacklineError::Database(_))));
    }

    #[test]
    fn test_inventory_roundtrip_through_row() {
        let inv = ProjectInventory::new(ProjectId::new("P-1").unwrap(), 1000, 500).with_export(120);
        let row = PostgreSQLInventory::from_domain(&inv).unwrap();
        assert_eq!(row.remain_quantity, 380);
        assert_eq!(row.to_domain().unwrap(), inv);
    }

    #[test]
    fn test_to_i64_overflow() {
        assert!(to_i64(u64::MAX, "quantity").is_err());
    }
}
