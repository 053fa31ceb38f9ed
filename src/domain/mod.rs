//! Domain models and types for Packline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`LineId`], [`GroupId`], [`PackingCode`], [`ProjectId`])
//! - **Packing models** ([`PackingGroup`], [`ProductLine`], [`LedgerLine`], [`PackingListDocument`])
//! - **Inventory model** ([`ProjectInventory`])
//! - **Wire messages** exchanged with the ledger transport ([`messages`])
//! - **Error types** ([`PacklineError`], [`ConstraintViolation`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are newtypes so a packing code can never be passed where a project id is
//! expected:
//!
//! ```rust
//! use packline::domain::{PackingCode, ProjectId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let code = PackingCode::new("PK-001")?;
//! let project = ProjectId::new("P-2024-17")?;
//!
//! // let wrong: ProjectId = code;  // Compile error!
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod inventory;
pub mod messages;
pub mod packing;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{ConstraintViolation, LineFailureDetail, PacklineError};
pub use ids::{GroupId, LineId, PackingCode, ProjectId};
pub use inventory::ProjectInventory;
pub use messages::{
    DeleteGroupResponse, DeleteLineResponse, ReconcileResponse, UpsertAction, UpsertLineRequest,
    UpsertLineResponse,
};
pub use packing::{
    DocumentGroup, DocumentLine, LedgerLine, PackingGroup, PackingListDocument, ProductLine,
};
pub use result::Result;
