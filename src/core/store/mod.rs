//! Packing line store
//!
//! Client-held staging of packing groups and product lines, mutated only through
//! [`StoreAction`]s.

pub mod action;
pub mod state;

pub use action::{ChangeSet, LineEdit, NewLine, StoreAction};
pub use state::{PackingLineStore, Transition};
