//! Project inventory model
//!
//! The inventory row is owned by the project subsystem. Only the export reconciler
//! writes `export_quantity` and `remain_quantity`.

use super::ids::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-project quantity record
///
/// # Examples
///
/// ```
/// use packline::domain::inventory::ProjectInventory;
/// use packline::domain::ids::ProjectId;
///
/// let inv = ProjectInventory::new(ProjectId::new("P-1").unwrap(), 600, 500);
/// let next = inv.with_export(120);
/// assert_eq!(next.remain_quantity, 380);
/// assert_eq!(next.version, inv.version + 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInventory {
    pub project_id: ProjectId,

    /// Quantity ordered
    pub quantity: u64,

    /// Quantity received into the warehouse
    pub entry_quantity: u64,

    /// Authoritative exported quantity
    pub export_quantity: u64,

    /// `entry_quantity - export_quantity`
    pub remain_quantity: u64,

    /// Optimistic concurrency token, bumped on every export commit
    pub version: u64,

    pub updated_at: DateTime<Utc>,
}

impl ProjectInventory {
    /// Creates an inventory with nothing exported yet
    pub fn new(project_id: ProjectId, quantity: u64, entry_quantity: u64) -> Self {
        Self {
            project_id,
            quantity,
            entry_quantity,
            export_quantity: 0,
            remain_quantity: entry_quantity,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Returns the next revision of this record with a new export quantity
    ///
    /// Callers must have checked `export_quantity <= entry_quantity` first.
    pub fn with_export(&self, export_quantity: u64) -> Self {
        Self {
            project_id: self.project_id.clone(),
            quantity: self.quantity,
            entry_quantity: self.entry_quantity,
            export_quantity,
            remain_quantity: self.entry_quantity.saturating_sub(export_quantity),
            version: self.version + 1,
            updated_at: Utc::now(),
        }
    }

    /// Whether the stored quantities satisfy `export <= entry` and `remain = entry - export`
    pub fn is_consistent(&self) -> bool {
        self.export_quantity <= self.entry_quantity
            && self.remain_quantity == self.entry_quantity - self.export_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectId {
        ProjectId::new("P-1").unwrap()
    }

    #[test]
    fn test_new_inventory_is_consistent() {
        let inv = ProjectInventory::new(project(), 1000, 500);
        assert_eq!(inv.export_quantity, 0);
        assert_eq!(inv.remain_quantity, 500);
        assert!(inv.is_consistent());
    }

    #[test]
    fn test_with_export_bumps_version() {
        let inv = ProjectInventory::new(project(), 1000, 500);
        let next = inv.with_export(500);
        assert_eq!(next.remain_quantity, 0);
        assert_eq!(next.version, 1);
        assert!(next.is_consistent());
    }

    #[test]
    fn test_inconsistent_record_detected() {
        let mut inv = ProjectInventory::new(project(), 1000, 500);
        inv.export_quantity = 600;
        assert!(!inv.is_consistent());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ProjectInventory::new(project(), 10, 5)).unwrap();
        assert_eq!(json["entryQuantity"], 5);
        assert_eq!(json["remainQuantity"], 5);
        assert_eq!(json["projectId"], "P-1");
    }
}
