use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::iter;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{ChangeItem, ChangePolicy, NodeInfo, ReleaseInput, TreeDump};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ordering::sort_changes;

/// Tree node in the arena-based release hierarchy.
#[derive(Debug)]
pub struct ReleaseNode {
    /// Version identifier of this release
    pub version: String,
    /// Change-items introduced by this release (deduplicated, first occurrence kept)
    pub changes: Vec<ChangeItem>,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in insertion order
    pub children: Vec<Index>,
}

impl ReleaseNode {
    fn from_input(input: &ReleaseInput) -> Self {
        let mut seen = HashSet::new();
        let changes = input
            .changes
            .iter()
            .filter(|c| seen.insert(c.id()))
            .cloned()
            .collect();
        Self {
            version: input.version.clone(),
            changes,
            parent: None,
            children: Vec::new(),
        }
    }
}

impl fmt::Display for ReleaseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changes.is_empty() {
            return write!(f, "{}", self.version);
        }
        let ids: Vec<&str> = self.changes.iter().map(ChangeItem::id).collect();
        write!(f, "{} [{}]", self.version, ids.join(", "))
    }
}

/// Arena-based release tree without synchronization.
///
/// Nodes live in a generational arena and are addressed through a
/// version -> index map; parent/children links are arena indices, so there is
/// no ownership cycle between a node and its parent.
#[derive(Debug, Default)]
pub struct ReleaseArena {
    arena: Arena<ReleaseNode>,
    by_version: HashMap<String, Index>,
    root: Option<Index>,
}

impl ReleaseArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_version.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_version.is_empty()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.by_version.contains_key(version)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn root_version(&self) -> Option<&str> {
        self.root
            .and_then(|idx| self.arena.get(idx))
            .map(|n| n.version.as_str())
    }

    pub fn get_node(&self, idx: Index) -> Option<&ReleaseNode> {
        self.arena.get(idx)
    }

    pub fn node(&self, version: &str) -> Option<&ReleaseNode> {
        self.by_version.get(version).and_then(|&idx| self.arena.get(idx))
    }

    fn lookup(&self, version: &str) -> DomainResult<Index> {
        self.by_version
            .get(version)
            .copied()
            .ok_or_else(|| DomainError::VersionNotFound(version.to_string()))
    }

    fn version_of(&self, idx: Index) -> &str {
        self.arena.get(idx).map(|n| n.version.as_str()).unwrap_or("")
    }

    /// Add an unlinked node. Used by the builder's first pass.
    pub(crate) fn add_detached(&mut self, input: &ReleaseInput) -> DomainResult<Index> {
        if self.by_version.contains_key(&input.version) {
            return Err(DomainError::DuplicateVersion(input.version.clone()));
        }
        let idx = self.arena.insert(ReleaseNode::from_input(input));
        self.by_version.insert(input.version.clone(), idx);
        Ok(idx)
    }

    pub(crate) fn index_of(&self, version: &str) -> Option<Index> {
        self.by_version.get(version).copied()
    }

    pub(crate) fn link(&mut self, child: Index, parent: Index) {
        if let Some(node) = self.arena.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.push(child);
        }
    }

    pub(crate) fn set_root(&mut self, idx: Index) {
        self.root = Some(idx);
    }

    /// Insert a single release, linking it below its parent.
    ///
    /// All checks run before the arena is touched, so a failed insert leaves
    /// the tree exactly as it was.
    #[instrument(level = "debug", skip(self, input), fields(version = %input.version, parent = %input.parent))]
    pub fn insert(&mut self, input: &ReleaseInput) -> DomainResult<()> {
        if self.contains(&input.version) {
            return Err(DomainError::DuplicateVersion(input.version.clone()));
        }

        let parent = if input.is_root() {
            if let Some(root) = self.root_version() {
                return Err(DomainError::RootExists {
                    version: input.version.clone(),
                    root: root.to_string(),
                });
            }
            None
        } else {
            Some(
                self.index_of(&input.parent)
                    .ok_or_else(|| DomainError::ParentNotFound {
                        version: input.version.clone(),
                        parent: input.parent.clone(),
                    })?,
            )
        };

        let mut node = ReleaseNode::from_input(input);
        node.parent = parent;
        let idx = self.arena.insert(node);
        self.by_version.insert(input.version.clone(), idx);

        match parent {
            Some(parent_idx) => {
                if let Some(parent) = self.arena.get_mut(parent_idx) {
                    parent.children.push(idx);
                }
            }
            None => self.root = Some(idx),
        }
        Ok(())
    }

    /// Walk from `idx` to the root, inclusive.
    fn ancestors(&self, idx: Index) -> impl Iterator<Item = Index> + '_ {
        iter::successors(Some(idx), move |&i| self.arena.get(i).and_then(|n| n.parent))
    }

    fn lca_index(&self, a: &str, b: &str) -> DomainResult<Index> {
        let idx_a = self.lookup(a)?;
        let idx_b = self.lookup(b)?;
        if idx_a == idx_b {
            return Ok(idx_a);
        }

        let ancestors_a: HashSet<Index> = self.ancestors(idx_a).collect();
        self.ancestors(idx_b)
            .find(|idx| ancestors_a.contains(idx))
            .ok_or_else(|| DomainError::NoCommonAncestor {
                a: a.to_string(),
                b: b.to_string(),
            })
    }

    /// Lowest common ancestor of two versions.
    #[instrument(level = "trace", skip(self))]
    pub fn find_lca(&self, a: &str, b: &str) -> DomainResult<&str> {
        let idx = self.lca_index(a, b)?;
        Ok(self.version_of(idx))
    }

    /// Inclusive ancestor chain from `version` up to the root.
    pub fn path_to_root(&self, version: &str) -> DomainResult<Vec<String>> {
        let idx = self.lookup(version)?;
        Ok(self
            .ancestors(idx)
            .map(|i| self.version_of(i).to_string())
            .collect())
    }

    /// Net change-set going from `start` to `end`, sorted for output.
    ///
    /// Changes on the path `end -> lca` are accumulated; changes on the path
    /// `start -> lca` are removed from the accumulator. With
    /// [`ChangePolicy::Strict`] a start-path change missing from the
    /// accumulator is a consistency error.
    #[instrument(level = "debug", skip(self))]
    pub fn calc_changes(
        &self,
        end: &str,
        start: &str,
        policy: ChangePolicy,
    ) -> DomainResult<Vec<ChangeItem>> {
        let lca = self.lca_index(end, start)?;
        let end_idx = self.lookup(end)?;
        let start_idx = self.lookup(start)?;

        let mut net: HashMap<&str, &ChangeItem> = HashMap::new();
        for idx in self.ancestors(end_idx).take_while(|&i| i != lca) {
            if let Some(node) = self.arena.get(idx) {
                for change in &node.changes {
                    net.insert(change.id(), change);
                }
            }
        }

        for idx in self.ancestors(start_idx).take_while(|&i| i != lca) {
            let Some(node) = self.arena.get(idx) else {
                continue;
            };
            for change in &node.changes {
                if net.remove(change.id()).is_none() && policy == ChangePolicy::Strict {
                    return Err(DomainError::ChangeNotOnEndPath {
                        change: change.id().to_string(),
                        node: node.version.clone(),
                        start: start.to_string(),
                        end: end.to_string(),
                    });
                }
            }
        }

        Ok(sort_changes(net.into_values().cloned()))
    }

    /// Snapshot with nodes sorted by version.
    pub fn dump(&self) -> TreeDump {
        let sorted: BTreeMap<&str, Index> = self
            .by_version
            .iter()
            .map(|(v, &idx)| (v.as_str(), idx))
            .collect();

        let nodes = sorted
            .into_values()
            .filter_map(|idx| self.arena.get(idx))
            .map(|node| NodeInfo {
                version: node.version.clone(),
                from_ver: node
                    .parent
                    .map(|p| self.version_of(p).to_string())
                    .unwrap_or_default(),
                changes: node.changes.iter().map(|c| c.id().to_string()).collect(),
                children: node
                    .children
                    .iter()
                    .map(|&c| self.version_of(c).to_string())
                    .collect(),
            })
            .collect();

        TreeDump {
            platform: String::new(),
            node_count: self.len(),
            root: self.root_version().unwrap_or_default().to_string(),
            stale: false,
            nodes,
        }
    }

    /// Pre-order traversal from the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }
}

pub struct TreeIterator<'a> {
    arena: &'a ReleaseArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a ReleaseArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a ReleaseNode);

    fn next(&mut self) -> Option<Self::Item> {
        let current_idx = self.stack.pop()?;
        let node = self.arena.get_node(current_idx)?;
        // Push children in reverse order for left-to-right traversal
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some((current_idx, node))
    }
}
