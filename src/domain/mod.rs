//! Domain layer: release lineage entities and the tree algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod ordering;
pub mod render;
pub mod tree;

pub use arena::{ReleaseArena, ReleaseNode};
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use ordering::sort_changes;
pub use render::TreeRender;
pub use tree::ReleaseTree;
