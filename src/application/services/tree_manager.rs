//! Per-platform release tree registry
//!
//! Owns one [`ReleaseTree`] per platform. The registry lock only guards the
//! platform -> tree map; each tree has its own reader/writer lock, and the
//! registry lock is always released before a tree operation starts.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::application::error_ext::IoResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ChangeItem, ChangePolicy, ReleaseInput, ReleaseTree, TreeDump};
use crate::infrastructure::traits::ReleaseSource;

/// Size and root of one platform tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub platform: String,
    pub node_count: usize,
    pub root: String,
}

impl TreeStats {
    fn of(platform: &str, tree: &ReleaseTree) -> Self {
        let arena = tree.read();
        Self {
            platform: platform.to_string(),
            node_count: arena.len(),
            root: arena.root_version().unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} releases, root {}",
            self.platform, self.node_count, self.root
        )
    }
}

/// Result of rebuilding one platform from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    Built(TreeStats),
    /// The store has no releases left for the platform; its entry was dropped.
    Removed,
}

/// Result of loading every platform from the store.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub built: Vec<TreeStats>,
    pub failures: Vec<(String, ApplicationError)>,
}

impl LoadSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, platform: &str) -> Option<&ApplicationError> {
        self.failures
            .iter()
            .find(|(p, _)| p == platform)
            .map(|(_, e)| e)
    }
}

fn load_err(
    platform: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> ApplicationError {
    ApplicationError::Load {
        platform: platform.to_string(),
        source: source.into(),
    }
}

/// Registry of release trees keyed by platform.
#[derive(Debug, Default)]
pub struct TreeManager {
    trees: RwLock<HashMap<String, Arc<ReleaseTree>>>,
}

impl TreeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a platform's releases and build its tree; `None` if it has no releases.
    fn build_tree<S>(source: &S, platform: &str) -> ApplicationResult<Option<ReleaseTree>>
    where
        S: ReleaseSource + ?Sized,
    {
        let records = source
            .releases(platform)
            .map_err(|e| load_err(platform, e))?;
        if records.is_empty() {
            return Ok(None);
        }
        let inputs: Vec<ReleaseInput> = records.iter().map(|r| r.to_input()).collect();
        let tree = ReleaseTree::build(&inputs).map_err(|e| load_err(platform, e))?;
        Ok(Some(tree))
    }

    /// Build a tree for every platform in the store.
    ///
    /// Platforms are built in parallel. A failure aborts only the affected
    /// platform and is reported in the summary with the platform attached.
    #[instrument(level = "debug", skip(self, source))]
    pub fn load_all<S>(&self, source: &S) -> ApplicationResult<LoadSummary>
    where
        S: ReleaseSource + ?Sized,
    {
        let platforms = source.platforms().with_context("list", "platforms")?;

        let results: Vec<(String, ApplicationResult<Option<ReleaseTree>>)> = platforms
            .into_par_iter()
            .map(|platform| {
                let result = Self::build_tree(source, &platform);
                (platform, result)
            })
            .collect();

        let mut summary = LoadSummary::default();
        for (platform, result) in results {
            match result {
                Ok(Some(tree)) => {
                    let stats = TreeStats::of(&platform, &tree);
                    info!(
                        platform = %platform,
                        node_count = stats.node_count,
                        root = %stats.root,
                        "tree built"
                    );
                    self.trees.write().insert(platform, Arc::new(tree));
                    summary.built.push(stats);
                }
                Ok(None) => {
                    self.trees.write().remove(&platform);
                }
                Err(e) => {
                    error!(platform = %platform, error = %e, "tree load failed");
                    summary.failures.push((platform, e));
                }
            }
        }
        Ok(summary)
    }

    /// Add one release to its platform tree, creating the tree on first insert.
    #[instrument(level = "debug", skip(self, input), fields(version = %input.version))]
    pub fn insert(&self, platform: &str, input: &ReleaseInput) -> ApplicationResult<TreeStats> {
        let existing = self.tree(platform);
        let tree = match existing {
            Some(tree) => tree,
            None => {
                let mut trees = self.trees.write();
                match trees.entry(platform.to_string()) {
                    Entry::Occupied(e) => Arc::clone(e.get()),
                    Entry::Vacant(slot) => {
                        let tree = ReleaseTree::build(std::slice::from_ref(input))
                            .map_err(|e| ApplicationError::tree(platform, e))?;
                        let stats = TreeStats::of(platform, &tree);
                        slot.insert(Arc::new(tree));
                        info!(
                            platform = %platform,
                            node_count = stats.node_count,
                            root = %stats.root,
                            inserted_version = %input.version,
                            "tree created"
                        );
                        return Ok(stats);
                    }
                }
            }
        };

        tree.insert_node(input)
            .map_err(|e| ApplicationError::tree(platform, e))?;
        let stats = TreeStats::of(platform, &tree);
        info!(
            platform = %platform,
            node_count = stats.node_count,
            root = %stats.root,
            inserted_version = %input.version,
            "tree updated"
        );
        Ok(stats)
    }

    /// Rebuild a platform tree from the store and swap it in.
    ///
    /// Zero releases removes the platform entry. If the rebuild fails the
    /// previous tree stays in place, marked stale.
    #[instrument(level = "debug", skip(self, source))]
    pub fn rebuild<S>(&self, platform: &str, source: &S) -> ApplicationResult<RebuildOutcome>
    where
        S: ReleaseSource + ?Sized,
    {
        match Self::build_tree(source, platform) {
            Ok(Some(tree)) => {
                let stats = TreeStats::of(platform, &tree);
                self.trees
                    .write()
                    .insert(platform.to_string(), Arc::new(tree));
                info!(
                    platform = %platform,
                    node_count = stats.node_count,
                    root = %stats.root,
                    "tree rebuilt"
                );
                Ok(RebuildOutcome::Built(stats))
            }
            Ok(None) => {
                self.trees.write().remove(platform);
                info!(platform = %platform, "tree removed");
                Ok(RebuildOutcome::Removed)
            }
            Err(e) => {
                if let Some(old) = self.tree(platform) {
                    old.mark_stale();
                    warn!(platform = %platform, error = %e, "rebuild failed, keeping stale tree");
                }
                Err(e)
            }
        }
    }

    /// Tree handle for a platform. The registry lock is released on return.
    pub fn tree(&self, platform: &str) -> Option<Arc<ReleaseTree>> {
        self.trees.read().get(platform).cloned()
    }

    fn live_tree(&self, platform: &str) -> ApplicationResult<Arc<ReleaseTree>> {
        let tree = self
            .tree(platform)
            .ok_or_else(|| ApplicationError::NoTree(platform.to_string()))?;
        if tree.is_stale() {
            return Err(ApplicationError::StaleTree(platform.to_string()));
        }
        Ok(tree)
    }

    pub fn calc_changes(
        &self,
        platform: &str,
        end: &str,
        start: &str,
    ) -> ApplicationResult<Vec<ChangeItem>> {
        self.calc_changes_with(platform, end, start, ChangePolicy::Strict)
    }

    pub fn calc_changes_with(
        &self,
        platform: &str,
        end: &str,
        start: &str,
        policy: ChangePolicy,
    ) -> ApplicationResult<Vec<ChangeItem>> {
        let tree = self.live_tree(platform)?;
        let changes = tree.calc_changes_with(end, start, policy).map_err(|e| {
            if e.is_consistency() {
                warn!(platform = %platform, error = %e, "inconsistent lineage");
            }
            ApplicationError::tree(platform, e)
        })?;
        debug!(
            platform = %platform,
            end = %end,
            start = %start,
            count = changes.len(),
            "changes calculated"
        );
        Ok(changes)
    }

    pub fn find_lca(&self, platform: &str, a: &str, b: &str) -> ApplicationResult<String> {
        self.live_tree(platform)?
            .find_lca(a, b)
            .map_err(|e| ApplicationError::tree(platform, e))
    }

    /// Lineage of a release from itself up to the root.
    pub fn path(&self, platform: &str, version: &str) -> ApplicationResult<Vec<String>> {
        self.live_tree(platform)?
            .path_to_root(version)
            .map_err(|e| ApplicationError::tree(platform, e))
    }

    /// Snapshot of a platform tree; also served for stale trees.
    pub fn dump(&self, platform: &str) -> ApplicationResult<TreeDump> {
        let tree = self
            .tree(platform)
            .ok_or_else(|| ApplicationError::NoTree(platform.to_string()))?;
        let mut dump = tree.dump();
        dump.platform = platform.to_string();
        Ok(dump)
    }

    pub fn render(&self, platform: &str) -> ApplicationResult<String> {
        self.tree(platform)
            .map(|t| t.render())
            .ok_or_else(|| ApplicationError::NoTree(platform.to_string()))
    }

    /// Platforms with a tree, sorted.
    pub fn platforms(&self) -> Vec<String> {
        let mut platforms: Vec<String> = self.trees.read().keys().cloned().collect();
        platforms.sort();
        platforms
    }

    pub fn stats(&self, platform: &str) -> Option<TreeStats> {
        self.tree(platform).map(|t| TreeStats::of(platform, &t))
    }

    pub fn remove(&self, platform: &str) -> bool {
        self.trees.write().remove(platform).is_some()
    }
}
