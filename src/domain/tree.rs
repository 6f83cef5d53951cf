//! Thread-safe release tree: a [`ReleaseArena`] behind a reader/writer lock.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::instrument;

use crate::domain::arena::ReleaseArena;
use crate::domain::builder::TreeBuilder;
use crate::domain::entities::{ChangeItem, ChangePolicy, ReleaseInput, TreeDump};
use crate::domain::error::DomainResult;
use crate::domain::render::TreeRender;

/// One platform's release lineage.
///
/// Reads (LCA, diff, dump) share the lock; inserts take it exclusively, so a
/// query observes a tree either before or after an insert, never a node that
/// is half linked.
#[derive(Debug, Default)]
pub struct ReleaseTree {
    inner: RwLock<ReleaseArena>,
    stale: AtomicBool,
}

impl ReleaseTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a complete set of releases.
    pub fn build(inputs: &[ReleaseInput]) -> DomainResult<Self> {
        let arena = TreeBuilder::new().build(inputs)?;
        Ok(Self::from_arena(arena))
    }

    pub fn from_arena(arena: ReleaseArena) -> Self {
        Self {
            inner: RwLock::new(arena),
            stale: AtomicBool::new(false),
        }
    }

    /// Insert a single release under its parent.
    pub fn insert_node(&self, input: &ReleaseInput) -> DomainResult<()> {
        self.inner.write().insert(input)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn find_lca(&self, a: &str, b: &str) -> DomainResult<String> {
        self.inner.read().find_lca(a, b).map(str::to_string)
    }

    /// Net change-set from `start` to `end` with the strict subset check.
    pub fn calc_changes(&self, end: &str, start: &str) -> DomainResult<Vec<ChangeItem>> {
        self.calc_changes_with(end, start, ChangePolicy::Strict)
    }

    pub fn calc_changes_with(
        &self,
        end: &str,
        start: &str,
        policy: ChangePolicy,
    ) -> DomainResult<Vec<ChangeItem>> {
        self.inner.read().calc_changes(end, start, policy)
    }

    pub fn path_to_root(&self, version: &str) -> DomainResult<Vec<String>> {
        self.inner.read().path_to_root(version)
    }

    /// Consistent snapshot taken under the read lock.
    pub fn dump(&self) -> TreeDump {
        let mut dump = self.inner.read().dump();
        dump.stale = self.is_stale();
        dump
    }

    /// Text rendering of the hierarchy below the root.
    pub fn render(&self) -> String {
        self.inner.read().to_tree_string().to_string()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.inner.read().contains(version)
    }

    pub fn root(&self) -> Option<String> {
        self.inner.read().root_version().map(str::to_string)
    }

    /// Direct read access for callers that need several queries on one snapshot.
    pub fn read(&self) -> RwLockReadGuard<'_, ReleaseArena> {
        self.inner.read()
    }

    /// Set after a failed rebuild: the tree no longer mirrors the store.
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}
