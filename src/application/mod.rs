//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on the store traits.

pub mod error;
pub mod error_ext;
pub mod services;

pub use error::{ApplicationError, ApplicationResult, ValidationDetail};
pub use error_ext::IoResultExt;
