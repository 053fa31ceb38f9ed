//! Export reconciliation against the project inventory ledger

pub mod reconciler;

pub use reconciler::{candidate_export_quantity, ExportReconciler};
