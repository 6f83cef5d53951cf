//! Infrastructure layer: store implementations and DI container
//!
//! This layer implements the store traits and wires up services.

pub mod catalog;
pub mod di;
pub mod error;
pub mod memory;
pub mod traits;

pub use catalog::CatalogStore;
pub use error::{InfraError, InfraResult};
pub use memory::InMemoryStore;
