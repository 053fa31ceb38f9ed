//! Request and response bodies exchanged with the ledger transport
//!
//! Field names follow the camelCase wire form.

use super::errors::{ConstraintViolation, PacklineError};
use super::ids::{LineId, PackingCode, ProjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upsert of one packing line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLineRequest {
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

    /// Set only for the first send of a brand-new line
    pub force_insert: bool,

    pub project_id: Option<ProjectId>,
}

impl UpsertLineRequest {
    /// `packaging_method × packaging_count × box_count`
    pub fn export_quantity(&self) -> u64 {
        self.quantity_per_box * u64::from(self.box_count)
    }
}

/// What the ledger did with an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Inserted,
    Updated,
}

impl std::fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertAction::Inserted => write!(f, "inserted"),
            UpsertAction::Updated => write!(f, "updated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLineResponse {
    pub success: bool,
    pub action: UpsertAction,
    pub id: LineId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLineResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGroupResponse {
    pub success: bool,
    pub deleted_count: usize,
}

/// Reconciliation outcome in wire form
///
/// Serializes untagged, so success and failure bodies have exactly the fields the
/// transport expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReconcileResponse {
    Failure(ReconcileFailure),
    Success(ReconcileSuccess),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSuccess {
    pub success: bool,
    pub export_quantity: u64,
    pub remain_quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileFailure {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ConstraintViolation>,
}

impl ReconcileResponse {
    pub fn success(export_quantity: u64, remain_quantity: u64) -> Self {
        ReconcileResponse::Success(ReconcileSuccess {
            success: true,
            export_quantity,
            remain_quantity,
        })
    }

    /// Builds the failure body for an error, attaching numeric details for constraint violations
    pub fn failure(err: &PacklineError) -> Self {
        let details = match err {
            PacklineError::ConstraintViolation(violation) => Some(*violation),
            _ => None,
        };
        ReconcileResponse::Failure(ReconcileFailure {
            success: false,
            error: err.to_string(),
            details,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReconcileResponse::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_request_wire_shape() {
        let req = UpsertLineRequest {
            line_id: LineId::generate(),
            packing_code: PackingCode::new("PK-001").unwrap(),
            pl_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            logistic_company: Some("DHL".to_string()),
            product_name: "Hinge".to_string(),
            sku: "H-10".to_string(),
            packaging_method: 5,
            packaging_count: 2,
            box_count: 10,
            quantity_per_box: 10,
            force_insert: true,
            project_id: None,
        };
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["packingCode"], "PK-001");
        assert_eq!(value["plDate"], "2024-05-02");
        assert_eq!(value["quantityPerBox"], 10);
        assert_eq!(value["forceInsert"], true);
        assert!(value["projectId"].is_null());
        assert_eq!(req.export_quantity(), 100);
    }

    #[test]
    fn test_upsert_action_lowercase() {
        assert_eq!(
            serde_json::to_value(UpsertAction::Inserted).unwrap(),
            json!("inserted")
        );
        assert_eq!(UpsertAction::Updated.to_string(), "updated");
    }

    #[test]
    fn test_reconcile_success_body() {
        let value = serde_json::to_value(ReconcileResponse::success(100, 400)).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "exportQuantity": 100, "remainQuantity": 400})
        );
    }

    #[test]
    fn test_reconcile_failure_carries_details() {
        let err = PacklineError::ConstraintViolation(ConstraintViolation::new(550, 500));
        let value = serde_json::to_value(ReconcileResponse::failure(&err)).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["details"]["candidateExportQuantity"], 550);
        assert_eq!(value["details"]["entryQuantity"], 500);
        assert_eq!(value["details"]["difference"], 50);
    }

    #[test]
    fn test_reconcile_failure_without_details() {
        let err = PacklineError::NotFound("project P-9".to_string());
        let response = ReconcileResponse::failure(&err);
        assert!(!response.is_success());

        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_reconcile_response_parses_both_forms() {
        let ok: ReconcileResponse =
            serde_json::from_str(r#"{"success":true,"exportQuantity":1,"remainQuantity":2}"#)
                .unwrap();
        assert!(ok.is_success());

        let failed: ReconcileResponse = serde_json::from_str(
            r#"{"success":false,"error":"x","details":{"candidateExportQuantity":3,"entryQuantity":2,"difference":1}}"#,
        )
        .unwrap();
        assert!(!failed.is_success());
    }
}
