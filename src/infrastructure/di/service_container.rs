//! Service container for dependency injection
//!
//! Wires up the release store, the tree registry and the release service.

use std::sync::Arc;

use crate::application::services::{ReleaseService, TreeManager};
use crate::config::Settings;
use crate::infrastructure::catalog::CatalogStore;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::ReleaseStore;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Authoritative release store
    pub store: Arc<dyn ReleaseStore>,

    /// In-memory release trees, one per platform
    pub trees: Arc<TreeManager>,

    pub releases: ReleaseService,
}

impl ServiceContainer {
    /// Create a container backed by the catalog file named in `settings`.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        if settings.catalog.is_dir() {
            return Err(InfraError::Catalog {
                message: format!("{} is a directory", settings.catalog.display()),
            });
        }
        let store = Arc::new(CatalogStore::new(settings.catalog.clone()));
        Ok(Self::with_deps(settings, store))
    }

    /// Create a service container with a custom store (for testing).
    pub fn with_deps(settings: Settings, store: Arc<dyn ReleaseStore>) -> Self {
        let settings = Arc::new(settings);
        let trees = Arc::new(TreeManager::new());
        let releases = ReleaseService::new(Arc::clone(&store), Arc::clone(&trees))
            .with_policy(settings.policy);

        Self {
            settings,
            store,
            trees,
            releases,
        }
    }
}
