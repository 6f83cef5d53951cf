//! Error conversion helpers for store operations
//!
//! Provides extension traits for cleaner error handling with context.

use std::fmt::Display;
use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add context to an I/O error coming from a release store.
    ///
    /// # Example
    /// ```ignore
    /// store.releases(platform)
    ///     .with_context("read releases", platform)?;
    /// ```
    fn with_context(self, action: &str, subject: impl Display) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_context(self, action: &str, subject: impl Display) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, subject),
            source: Box::new(e),
        })
    }
}
