//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the store traits (ReleaseSource, ReleaseStore)
//! but are themselves concrete structs, not traits.

mod release;
mod tree_manager;

pub use release::{RebuildStatus, ReleaseService, ReleaseSubmission};
pub use tree_manager::{LoadSummary, RebuildOutcome, TreeManager, TreeStats};
