//! Packing list domain models
//!
//! [`PackingGroup`] and [`ProductLine`] are the staged, session-owned view of a packing
//! list. [`LedgerLine`] is the authoritative row as persisted by the packing ledger.
//! [`PackingListDocument`] is the importable JSON form of a whole packing list.

use super::ids::{GroupId, LineId, PackingCode, ProjectId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A set of product lines shipped together under one packing code
///
/// All lines of a group share its `box_count`. The packing code is optional while the
/// group is being typed in; lines of a group without a code are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingGroup {
    /// Session-local identity, stable across packing code renames
    pub id: GroupId,

    /// Packing code, unique within a work date
    pub packing_code: Option<PackingCode>,

    /// Packing list date of the group
    pub pl_date: Option<NaiveDate>,

    /// Carrier handling the shipment
    pub logistic_company: Option<String>,

    /// Project the group was created from (absent for manually entered groups)
    pub project_id: Option<ProjectId>,

    /// Number of boxes, shared by every line of the group
    pub box_count: u32,

    /// Lines in display order
    pub line_ids: Vec<LineId>,
}

impl PackingGroup {
    /// Creates an empty group with a fresh identity
    pub fn new(packing_code: Option<PackingCode>, box_count: u32) -> Self {
        Self {
            id: GroupId::generate(),
            packing_code,
            pl_date: None,
            logistic_company: None,
            project_id: None,
            box_count,
            line_ids: Vec::new(),
        }
    }

    /// Sets the group date
    pub fn with_pl_date(mut self, pl_date: NaiveDate) -> Self {
        self.pl_date = Some(pl_date);
        self
    }

    /// Sets the logistic company
    pub fn with_logistic_company(mut self, company: impl Into<String>) -> Self {
        self.logistic_company = Some(company.into());
        self
    }

    /// Links the group to a project
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }
}

/// One product inside a packing group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    /// Stable identity, never reused
    pub id: LineId,

    /// Owning group
    pub group_id: GroupId,

    pub product_name: String,

    pub sku: String,

    /// Units per inner pack
    pub packaging_method: u32,

    /// Inner packs per box
    pub packaging_count: u32,

    /// Copy of the owning group's box count
    pub box_count: u32,

    /// `packaging_method × packaging_count × box_count`
    pub export_quantity: u64,

    /// Project the line draws from
    pub project_id: Option<ProjectId>,

    /// Date explicitly carried on the line, if any
    pub pl_date: Option<NaiveDate>,

    /// Written to the packing ledger at least once
    pub persisted: bool,
}

impl ProductLine {
    /// Whether the line carries a product name
    ///
    /// Together with a packing code on the owning group this is required before the
    /// line may be sent to the ledger.
    pub fn has_product_name(&self) -> bool {
        !self.product_name.trim().is_empty()
    }

    /// Units in one box (`packaging_method × packaging_count`)
    pub fn quantity_per_box(&self) -> u64 {
        u64::from(self.packaging_method) * u64::from(self.packaging_count)
    }
}

/// A packing line as stored in the packing ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerLine {
    pub line_id: LineId,
    pub packing_code: PackingCode,
    pub pl_date: NaiveDate,
    pub logistic_company: Option<String>,
    pub product_name: String,
    pub sku: String,
    pub packaging_method: u32,
    pub packaging_count: u32,
    pub box_count: u32,
    pub quantity_per_box: u64,
    pub export_quantity: u64,
    pub project_id: Option<ProjectId>,
    pub updated_at: DateTime<Utc>,
}

/// Importable packing list
///
/// Packaging fields are kept as raw JSON values: imported sheets carry numbers, numeric
/// strings, blanks and garbage side by side. They are coerced when imported into a
/// session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingListDocument {
    /// Work date applied to every group without its own date
    #[serde(default)]
    pub pl_date: Option<NaiveDate>,

    #[serde(default)]
    pub groups: Vec<DocumentGroup>,
}

/// Group entry of a [`PackingListDocument`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentGroup {
    #[serde(default)]
    pub packing_code: Option<String>,

    #[serde(default)]
    pub pl_date: Option<NaiveDate>,

    #[serde(default)]
    pub logistic_company: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub box_count: serde_json::Value,

    #[serde(default)]
    pub lines: Vec<DocumentLine>,
}

/// Line entry of a [`DocumentGroup`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
    /// Existing line id; a fresh one is generated when absent
    #[serde(default)]
    pub line_id: Option<LineId>,

    #[serde(default)]
    pub product_name: String,

    #[serde(default)]
    pub sku: String,

    #[serde(default)]
    pub packaging_method: serde_json::Value,

    #[serde(default)]
    pub packaging_count: serde_json::Value,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub pl_date: Option<NaiveDate>,
}

impl PackingListDocument {
    /// Parses a packing list from JSON
    pub fn from_json(json: &str) -> super::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Total number of lines across all groups
    pub fn line_count(&self) -> usize {
        self.groups.iter().map(|g| g.lines.len()).sum()
    }
}
