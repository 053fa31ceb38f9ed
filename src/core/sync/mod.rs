//! Auto-save synchronization
//!
//! - [`synchronizer`] - Debounced upsert passes over the staged store
//! - [`report`] - Per-pass outcome counts and failures
//! - [`status`] - Save status with timed revert to idle

pub mod report;
pub mod status;
pub mod synchronizer;

pub use report::SyncReport;
pub use status::{SaveStatus, StatusBoard};
pub use synchronizer::AutoSaveSynchronizer;
