//! Domain error types
//!
//! This module defines the error hierarchy for Packline.
//! All errors are domain-specific and don't expose third-party types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main Packline error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum PacklineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single ledger request failed (timeout, dropped connection, rejected statement)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced group, line or project does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reconciliation would push the export quantity above the received quantity
    #[error("Constraint violation: {0}")]
    ConstraintViolation(ConstraintViolation),

    /// Concurrent reconciliations kept invalidating each other
    #[error("Lock contention on project {project_id}: gave up after {attempts} attempts")]
    LockContention { project_id: String, attempts: usize },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl PacklineError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PacklineError::Transport(_) | PacklineError::Connection(_)
        )
    }
}

/// Details of a rejected reconciliation
///
/// `difference` is always `candidate_export_quantity - entry_quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintViolation {
    /// Export quantity recomputed from the packing ledger
    pub candidate_export_quantity: u64,

    /// Quantity received into the warehouse
    pub entry_quantity: u64,

    /// How far the candidate overshoots the entry quantity
    pub difference: u64,
}

impl ConstraintViolation {
    /// Creates the violation record for a candidate that exceeds the entry quantity
    pub fn new(candidate_export_quantity: u64, entry_quantity: u64) -> Self {
        Self {
            candidate_export_quantity,
            entry_quantity,
            difference: candidate_export_quantity.saturating_sub(entry_quantity),
        }
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "export quantity {} exceeds entry quantity {} by {}",
            self.candidate_export_quantity, self.entry_quantity, self.difference
        )
    }
}

/// Per-line failure details collected during a synchronization pass
#[derive(Debug, Clone)]
pub struct LineFailureDetail {
    /// Line that failed to persist
    pub line_id: String,

    /// Packing code of the owning group at the time of the attempt
    pub packing_code: Option<String>,

    /// Error message
    pub message: String,

    /// Whether the failure was a transport problem that a resend may fix
    pub retryable: bool,
}

impl LineFailureDetail {
    /// Creates a new failure detail
    pub fn new(line_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line_id: line_id.into(),
            packing_code: None,
            message: message.into(),
            retryable: false,
        }
    }

    /// Sets the packing code
    pub fn with_packing_code(mut self, packing_code: impl Into<String>) -> Self {
        self.packing_code = Some(packing_code.into());
        self
    }

    /// Marks the failure as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PacklineError {
    fn from(err: std::io::Error) -> Self {
        PacklineError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PacklineError {
    fn from(err: serde_json::Error) -> Self {
        PacklineError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PacklineError {
    fn from(err: toml::de::Error) -> Self {
        PacklineError::Configuration(format!("TOML parse error: {err}"))
    }
}
