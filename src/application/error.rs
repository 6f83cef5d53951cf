//! Application-level errors (wraps domain errors)

use std::fmt;

use thiserror::Error;

use crate::domain::DomainError;

/// A single rejected field of a release submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetail {
    /// Position of the offending change-item, `None` for release-level fields
    pub index: Option<usize>,
    pub id: String,
    pub reason: String,
}

impl fmt::Display for ValidationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "changes[{}] '{}': {}", i, self.id, self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

fn join_details(details: &[ValidationDetail]) -> String {
    details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application errors wrap domain errors and add platform and store context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("platform '{platform}': {source}")]
    Tree {
        platform: String,
        #[source]
        source: DomainError,
    },

    #[error("no tree for platform '{0}'")]
    NoTree(String),

    #[error("tree for platform '{0}' is stale after a failed rebuild; rebuild it before querying")]
    StaleTree(String),

    #[error("load tree for platform '{platform}': {source}")]
    Load {
        platform: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("validation failed: {}", join_details(.details))]
    Validation { details: Vec<ValidationDetail> },

    #[error("release not found: {0}")]
    NotFound(String),

    #[error("versions are on different platforms: '{a}' ({a_platform}) vs '{b}' ({b_platform})")]
    CrossPlatform {
        a: String,
        a_platform: String,
        b: String,
        b_platform: String,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn tree(platform: impl Into<String>, source: DomainError) -> Self {
        Self::Tree {
            platform: platform.into(),
            source,
        }
    }

    /// The underlying domain error, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Tree { source, .. } => Some(source),
            ApplicationError::Load { source, .. } => source
                .downcast_ref::<DomainError>()
                .or_else(|| source.downcast_ref::<ApplicationError>().and_then(Self::domain)),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
