//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the release lineage rules.
/// These are independent of storage and presentation concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("duplicate version: {0}")]
    DuplicateVersion(String),

    #[error("parent version '{parent}' for node '{version}' not found")]
    ParentNotFound { version: String, parent: String },

    #[error("no root node found (no release has an empty parent version)")]
    NoRoot,

    #[error("cannot insert root '{version}': tree already has a root ('{root}')")]
    RootExists { version: String, root: String },

    #[error("cycle detected in release lineage at: {0}")]
    CycleDetected(String),

    #[error("version '{0}' not found in tree")]
    VersionNotFound(String),

    #[error("inconsistent tree: no common ancestor for '{a}' and '{b}'")]
    NoCommonAncestor { a: String, b: String },

    #[error(
        "change ID '{change}' from start path (node '{node}', version '{start}') \
         not found in end path changes (version '{end}' to LCA)"
    )]
    ChangeNotOnEndPath {
        change: String,
        node: String,
        start: String,
        end: String,
    },
}

impl DomainError {
    /// Consistency errors signal a data-integrity problem rather than a bad request.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            DomainError::NoCommonAncestor { .. } | DomainError::ChangeNotOnEndPath { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
