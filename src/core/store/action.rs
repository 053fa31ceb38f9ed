//! Store actions and the change sets they produce

use crate::core::quantity;
use crate::domain::{GroupId, LineId, PackingCode, PackingGroup, ProductLine, ProjectId};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// A line about to be added to a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    pub id: LineId,
    pub product_name: String,
    pub sku: String,
    pub packaging_method: u32,
    pub packaging_count: u32,

    /// Falls back to the group's project when absent
    pub project_id: Option<ProjectId>,
    pub pl_date: Option<NaiveDate>,
}

impl NewLine {
    /// Creates a line with a freshly generated id
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            id: LineId::generate(),
            product_name: product_name.into(),
            sku: String::new(),
            packaging_method: 0,
            packaging_count: 0,
            project_id: None,
            pl_date: None,
        }
    }

    /// Keeps an id that already exists in the ledger
    pub fn with_id(mut self, id: LineId) -> Self {
        self.id = id;
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = sku.into();
        self
    }

    pub fn with_packaging(mut self, packaging_method: u32, packaging_count: u32) -> Self {
        self.packaging_method = packaging_method;
        self.packaging_count = packaging_count;
        self
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_pl_date(mut self, pl_date: NaiveDate) -> Self {
        self.pl_date = Some(pl_date);
        self
    }
}

/// Edit of a single line field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    ProductName(String),
    Sku(String),
    PackagingMethod(u32),
    PackagingCount(u32),
    PlDate(Option<NaiveDate>),
}

impl LineEdit {
    /// Packaging method typed as free text
    pub fn packaging_method_input(input: &str) -> Self {
        LineEdit::PackagingMethod(quantity::coerce(input))
    }

    /// Packaging count typed as free text
    pub fn packaging_count_input(input: &str) -> Self {
        LineEdit::PackagingCount(quantity::coerce(input))
    }
}

/// Every mutation the packing line store accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Adds an empty group at the end
    AddGroup(PackingGroup),
    AddLine { group_id: GroupId, line: NewLine },
    EditLine { line_id: LineId, edit: LineEdit },
    SetPackingCode { group_id: GroupId, packing_code: Option<PackingCode> },
    SetBoxCount { group_id: GroupId, box_count: u32 },
    SetLogisticCompany { group_id: GroupId, company: Option<String> },
    SetGroupDate { group_id: GroupId, pl_date: Option<NaiveDate> },
    LinkProject { line_id: LineId, project_id: Option<ProjectId> },
    RemoveLine { line_id: LineId },
    RemoveGroup { group_id: GroupId },
    /// Records a successful ledger write; touches nothing
    MarkPersisted { line_ids: Vec<LineId> },
}

impl StoreAction {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::AddGroup(_) => "add_group",
            StoreAction::AddLine { .. } => "add_line",
            StoreAction::EditLine { .. } => "edit_line",
            StoreAction::SetPackingCode { .. } => "set_packing_code",
            StoreAction::SetBoxCount { .. } => "set_box_count",
            StoreAction::SetLogisticCompany { .. } => "set_logistic_company",
            StoreAction::SetGroupDate { .. } => "set_group_date",
            StoreAction::LinkProject { .. } => "link_project",
            StoreAction::RemoveLine { .. } => "remove_line",
            StoreAction::RemoveGroup { .. } => "remove_group",
            StoreAction::MarkPersisted { .. } => "mark_persisted",
        }
    }
}

/// What an applied action changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Lines whose ledger row is now stale
    pub touched: BTreeSet<LineId>,

    /// Lines that did not exist before
    pub created: BTreeSet<LineId>,

    /// Lines dropped from the store, as they were just before removal
    pub removed: Vec<ProductLine>,

    /// The change rewrote fields shared by a whole group
    pub structural: bool,
}

impl ChangeSet {
    /// True when the action changed nothing that needs persisting
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty() && self.created.is_empty() && self.removed.is_empty()
    }

    pub(crate) fn touch(&mut self, line_id: LineId) {
        self.touched.insert(line_id);
    }

    pub(crate) fn touch_all<'a>(&mut self, line_ids: impl IntoIterator<Item = &'a LineId>) {
        self.touched.extend(line_ids.into_iter().copied());
    }
}
