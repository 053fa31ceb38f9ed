//! Normalized packing line store
//!
//! Groups are keyed by [`GroupId`], lines by [`LineId`] with a back-reference to their
//! group. The store is only changed through [`PackingLineStore::apply`], which leaves
//! `self` untouched and returns the next store together with a [`ChangeSet`].

use super::action::{ChangeSet, LineEdit, NewLine, StoreAction};
use crate::core::quantity;
use crate::domain::{
    GroupId, LineId, PackingCode, PackingGroup, PacklineError, ProductLine, ProjectId, Result,
};
use std::collections::{BTreeSet, HashMap};

/// Result of applying one action
#[derive(Debug, Clone)]
pub struct Transition {
    pub store: PackingLineStore,
    pub changes: ChangeSet,
}

/// Session-owned staging area for packing groups and their lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackingLineStore {
    groups: HashMap<GroupId, PackingGroup>,
    lines: HashMap<LineId, ProductLine>,
    group_order: Vec<GroupId>,
}

impl PackingLineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups in display order
    pub fn groups(&self) -> impl Iterator<Item = &PackingGroup> {
        self.group_order.iter().filter_map(|id| self.groups.get(id))
    }

    pub fn group(&self, group_id: &GroupId) -> Option<&PackingGroup> {
        self.groups.get(group_id)
    }

    pub fn line(&self, line_id: &LineId) -> Option<&ProductLine> {
        self.lines.get(line_id)
    }

    /// Lines of a group in display order
    pub fn lines_of(&self, group_id: &GroupId) -> Vec<&ProductLine> {
        self.groups
            .get(group_id)
            .map(|g| g.line_ids.iter().filter_map(|id| self.lines.get(id)).collect())
            .unwrap_or_default()
    }

    /// Owning group of a line
    pub fn group_of(&self, line_id: &LineId) -> Option<&PackingGroup> {
        self.lines
            .get(line_id)
            .and_then(|line| self.groups.get(&line.group_id))
    }

    /// First group carrying the given packing code
    pub fn group_by_code(&self, packing_code: &PackingCode) -> Option<&PackingGroup> {
        self.groups()
            .find(|g| g.packing_code.as_ref() == Some(packing_code))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every line id, grouped and ordered as displayed
    pub fn line_ids(&self) -> Vec<LineId> {
        self.groups()
            .flat_map(|g| g.line_ids.iter().copied())
            .collect()
    }

    /// Projects referenced by any line
    pub fn linked_projects(&self) -> BTreeSet<ProjectId> {
        self.lines
            .values()
            .filter_map(|line| line.project_id.clone())
            .collect()
    }

    /// Sum of the staged export quantities for a project
    ///
    /// Informational only: reconciliation always recomputes from the ledger.
    pub fn staged_export_quantity(&self, project_id: &ProjectId) -> u64 {
        self.lines
            .values()
            .filter(|line| line.project_id.as_ref() == Some(project_id))
            .map(|line| line.export_quantity)
            .sum()
    }

    /// Applies an action, returning the next store and what changed
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown groups or lines and `Validation` for actions that
    /// would break a store invariant (duplicate ids, duplicate packing code on a date).
    pub fn apply(&self, action: StoreAction) -> Result<Transition> {
        let mut next = self.clone();
        let mut changes = ChangeSet::default();

        match action {
            StoreAction::AddGroup(group) => next.add_group(group)?,
            StoreAction::AddLine { group_id, line } => {
                next.add_line(group_id, line, &mut changes)?
            }
            StoreAction::EditLine { line_id, edit } => {
                next.edit_line(line_id, edit, &mut changes)?
            }
            StoreAction::SetPackingCode {
                group_id,
                packing_code,
            } => {
                let current = next.group_mut(&group_id)?;
                if current.packing_code != packing_code {
                    let pl_date = current.pl_date;
                    if let Some(code) = &packing_code {
                        next.ensure_code_free(code, pl_date, Some(group_id))?;
                    }
                    let group = next.group_mut(&group_id)?;
                    group.packing_code = packing_code;
                    changes.structural = true;
                    changes.touch_all(&group.line_ids);
                }
            }
            StoreAction::SetBoxCount {
                group_id,
                box_count,
            } => {
                let group = next.group_mut(&group_id)?;
                if group.box_count != box_count {
                    group.box_count = box_count;
                    let line_ids = group.line_ids.clone();
                    for line_id in &line_ids {
                        if let Some(line) = next.lines.get_mut(line_id) {
                            line.box_count = box_count;
                            recompute(line);
                        }
                    }
                    changes.structural = true;
                    changes.touch_all(&line_ids);
                }
            }
            StoreAction::SetLogisticCompany { group_id, company } => {
                let group = next.group_mut(&group_id)?;
                let company = company.filter(|c| !c.trim().is_empty());
                if group.logistic_company != company {
                    group.logistic_company = company;
                    changes.structural = true;
                    changes.touch_all(&group.line_ids);
                }
            }
            StoreAction::SetGroupDate { group_id, pl_date } => {
                let group = next.group_mut(&group_id)?;
                if group.pl_date != pl_date {
                    if let Some(code) = group.packing_code.clone() {
                        next.ensure_code_free(&code, pl_date, Some(group_id))?;
                    }
                    let group = next.group_mut(&group_id)?;
                    group.pl_date = pl_date;
                    changes.structural = true;
                    changes.touch_all(&group.line_ids);
                }
            }
            StoreAction::LinkProject {
                line_id,
                project_id,
            } => {
                let line = next.line_mut(&line_id)?;
                if line.project_id != project_id {
                    line.project_id = project_id;
                    changes.touch(line_id);
                }
            }
            StoreAction::RemoveLine { line_id } => {
                let line = next
                    .lines
                    .remove(&line_id)
                    .ok_or_else(|| PacklineError::NotFound(format!("line {line_id}")))?;
                if let Some(group) = next.groups.get_mut(&line.group_id) {
                    group.line_ids.retain(|id| *id != line_id);
                }
                changes.removed.push(line);
            }
            StoreAction::RemoveGroup { group_id } => {
                let group = next
                    .groups
                    .remove(&group_id)
                    .ok_or_else(|| PacklineError::NotFound(format!("group {group_id}")))?;
                next.group_order.retain(|id| *id != group_id);
                for line_id in &group.line_ids {
                    if let Some(line) = next.lines.remove(line_id) {
                        changes.removed.push(line);
                    }
                }
                changes.structural = true;
            }
            StoreAction::MarkPersisted { line_ids } => {
                for line_id in line_ids {
                    // Lines removed while their upsert was in flight are ignored
                    if let Some(line) = next.lines.get_mut(&line_id) {
                        line.persisted = true;
                    }
                }
            }
        }

        Ok(Transition {
            store: next,
            changes,
        })
    }

    fn add_group(&mut self, group: PackingGroup) -> Result<()> {
        if self.groups.contains_key(&group.id) {
            return Err(PacklineError::Validation(format!(
                "group {} already exists",
                group.id
            )));
        }
        if !group.line_ids.is_empty() {
            return Err(PacklineError::Validation(
                "new groups must start without lines".to_string(),
            ));
        }
        if let Some(code) = &group.packing_code {
            self.ensure_code_free(code, group.pl_date, None)?;
        }
        self.group_order.push(group.id);
        self.groups.insert(group.id, group);
        Ok(())
    }

    fn add_line(&mut self, group_id: GroupId, new: NewLine, changes: &mut ChangeSet) -> Result<()> {
        if self.lines.contains_key(&new.id) {
            return Err(PacklineError::Validation(format!(
                "line {} already exists",
                new.id
            )));
        }
        let group = self.group_mut(&group_id)?;
        group.line_ids.push(new.id);

        let mut line = ProductLine {
            id: new.id,
            group_id,
            product_name: new.product_name,
            sku: new.sku,
            packaging_method: new.packaging_method,
            packaging_count: new.packaging_count,
            box_count: group.box_count,
            export_quantity: 0,
            project_id: new.project_id.or_else(|| group.project_id.clone()),
            pl_date: new.pl_date,
            persisted: false,
        };
        recompute(&mut line);

        changes.created.insert(line.id);
        changes.touch(line.id);
        self.lines.insert(line.id, line);
        Ok(())
    }

    fn edit_line(&mut self, line_id: LineId, edit: LineEdit, changes: &mut ChangeSet) -> Result<()> {
        let line = self.line_mut(&line_id)?;
        let changed = match edit {
            LineEdit::ProductName(name) => replace(&mut line.product_name, name),
            LineEdit::Sku(sku) => replace(&mut line.sku, sku),
            LineEdit::PackagingMethod(value) => replace(&mut line.packaging_method, value),
            LineEdit::PackagingCount(value) => replace(&mut line.packaging_count, value),
            LineEdit::PlDate(date) => replace(&mut line.pl_date, date),
        };
        if changed {
            recompute(line);
            changes.touch(line_id);
        }
        Ok(())
    }

    fn ensure_code_free(
        &self,
        code: &PackingCode,
        pl_date: Option<chrono::NaiveDate>,
        except: Option<GroupId>,
    ) -> Result<()> {
        let taken = self.groups.values().any(|g| {
            Some(g.id) != except && g.packing_code.as_ref() == Some(code) && g.pl_date == pl_date
        });
        if taken {
            return Err(PacklineError::Validation(format!(
                "packing code {code} is already used on this date"
            )));
        }
        Ok(())
    }

    fn group_mut(&mut self, group_id: &GroupId) -> Result<&mut PackingGroup> {
        self.groups
            .get_mut(group_id)
            .ok_or_else(|| PacklineError::NotFound(format!("group {group_id}")))
    }

    fn line_mut(&mut self, line_id: &LineId) -> Result<&mut ProductLine> {
        self.lines
            .get_mut(line_id)
            .ok_or_else(|| PacklineError::NotFound(format!("line {line_id}")))
    }
}

fn recompute(line: &mut ProductLine) {
    line.export_quantity =
        quantity::compute(line.packaging_method, line.packaging_count, line.box_count);
}

/// Stores `value` into `slot`, reporting whether it differed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn code(s: &str) -> Option<PackingCode> {
        Some(PackingCode::new(s).unwrap())
    }

    fn store_with_group(box_count: u32) -> (PackingLineStore, GroupId) {
        let group = PackingGroup::new(code("PK-001"), box_count);
        let id = group.id;
        let t = PackingLineStore::new()
            .apply(StoreAction::AddGroup(group))
            .unwrap();
        (t.store, id)
    }

    fn add(store: &PackingLineStore, group_id: GroupId, line: NewLine) -> Transition {
        store
            .apply(StoreAction::AddLine { group_id, line })
            .unwrap()
    }

    #[test]
    fn test_add_line_inherits_box_count() {
        let (store, gid) = store_with_group(10);
        let new = NewLine::new("Hinge").with_packaging(5, 2);
        let line_id = new.id;
        let t = add(&store, gid, new);

        let line = t.store.line(&line_id).unwrap();
        assert_eq!(line.box_count, 10);
        assert_eq!(line.export_quantity, 100);
        assert!(!line.persisted);
        assert!(t.changes.created.contains(&line_id));
        assert!(t.changes.touched.contains(&line_id));
    }

    #[test]
    fn test_apply_leaves_original_untouched() {
        let (store, gid) = store_with_group(10);
        let t = add(&store, gid, NewLine::new("Hinge"));
        assert_eq!(store.line_count(), 0);
        assert_eq!(t.store.line_count(), 1);
    }

    #[test]
    fn test_box_count_change_touches_every_line() {
        let (store, gid) = store_with_group(10);
        let a = NewLine::new("A").with_packaging(5, 2);
        let b = NewLine::new("B").with_packaging(1, 3);
        let (a_id, b_id) = (a.id, b.id);
        let store = add(&add(&store, gid, a).store, gid, b).store;

        let t = store
            .apply(StoreAction::SetBoxCount {
                group_id: gid,
                box_count: 12,
            })
            .unwrap();

        assert!(t.changes.structural);
        assert_eq!(t.changes.touched.len(), 2);
        assert_eq!(t.store.line(&a_id).unwrap().export_quantity, 120);
        assert_eq!(t.store.line(&b_id).unwrap().export_quantity, 36);
        assert!(t.store.lines_of(&gid).iter().all(|l| l.box_count == 12));
    }

    #[test]
    fn test_unchanged_edit_touches_nothing() {
        let (store, gid) = store_with_group(10);
        let new = NewLine::new("Hinge").with_packaging(5, 2);
        let line_id = new.id;
        let store = add(&store, gid, new).store;

        let t = store
            .apply(StoreAction::EditLine {
                line_id,
                edit: LineEdit::PackagingMethod(5),
            })
            .unwrap();
        assert!(t.changes.is_empty());

        let t = store
            .apply(StoreAction::SetBoxCount {
                group_id: gid,
                box_count: 10,
            })
            .unwrap();
        assert!(t.changes.is_empty());
    }

    #[test]
    fn test_edit_recomputes_quantity() {
        let (store, gid) = store_with_group(10);
        let new = NewLine::new("Hinge").with_packaging(5, 2);
        let line_id = new.id;
        let store = add(&store, gid, new).store;

        let t = store
            .apply(StoreAction::EditLine {
                line_id,
                edit: LineEdit::packaging_count_input("oops"),
            })
            .unwrap();
        assert_eq!(t.store.line(&line_id).unwrap().export_quantity, 0);
        assert_eq!(t.changes.touched.len(), 1);
    }

    #[test]
    fn test_remove_group_drops_lines() {
        let (store, gid) = store_with_group(1);
        let store = add(&add(&store, gid, NewLine::new("A")).store, gid, NewLine::new("B")).store;

        let t = store
            .apply(StoreAction::RemoveGroup { group_id: gid })
            .unwrap();
        assert_eq!(t.changes.removed.len(), 2);
        assert!(t.store.is_empty());
        assert_eq!(t.store.line_count(), 0);
    }

    #[test]
    fn test_remove_unknown_line_fails() {
        let err = PackingLineStore::new()
            .apply(StoreAction::RemoveLine {
                line_id: LineId::generate(),
            })
            .unwrap_err();
        assert!(matches!(err, PacklineError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_packing_code_same_date_rejected() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let first = PackingGroup::new(code("PK-001"), 1).with_pl_date(date);
        let store = PackingLineStore::new()
            .apply(StoreAction::AddGroup(first))
            .unwrap()
            .store;

        let dup = PackingGroup::new(code("PK-001"), 1).with_pl_date(date);
        assert!(matches!(
            store.apply(StoreAction::AddGroup(dup)),
            Err(PacklineError::Validation(_))
        ));

        let other_day = PackingGroup::new(code("PK-001"), 1)
            .with_pl_date(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
        assert!(store.apply(StoreAction::AddGroup(other_day)).is_ok());
    }

    #[test]
    fn test_line_inherits_group_project() {
        let project = ProjectId::new("P-1").unwrap();
        let group = PackingGroup::new(code("PK-9"), 2).with_project(project.clone());
        let gid = group.id;
        let store = PackingLineStore::new()
            .apply(StoreAction::AddGroup(group))
            .unwrap()
            .store;
        let new = NewLine::new("A").with_packaging(3, 4);
        let line_id = new.id;
        let store = add(&store, gid, new).store;

        assert_eq!(store.line(&line_id).unwrap().project_id, Some(project.clone()));
        assert_eq!(store.staged_export_quantity(&project), 24);
        assert!(store.linked_projects().contains(&project));
    }

    #[test]
    fn test_mark_persisted_ignores_missing_lines() {
        let (store, gid) = store_with_group(1);
        let new = NewLine::new("A");
        let line_id = new.id;
        let store = add(&store, gid, new).store;

        let t = store
            .apply(StoreAction::MarkPersisted {
                line_ids: vec![line_id, LineId::generate()],
            })
            .unwrap();
        assert!(t.store.line(&line_id).unwrap().persisted);
        assert!(t.changes.is_empty());
    }
}
