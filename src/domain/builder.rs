//! Tree builder for constructing a release hierarchy from a full set of releases.

use std::collections::HashSet;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::ReleaseArena;
use crate::domain::entities::ReleaseInput;
use crate::domain::error::{DomainError, DomainResult};

/// Constructs a [`ReleaseArena`] from releases in any parent/child order.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    visited: HashSet<Index>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree in two passes: create every node, then link each to its parent.
    ///
    /// The first input with an empty parent version becomes the root. Empty
    /// input yields an empty tree.
    #[instrument(level = "debug", skip(self, inputs), fields(count = inputs.len()))]
    pub fn build(&mut self, inputs: &[ReleaseInput]) -> DomainResult<ReleaseArena> {
        self.visited.clear();
        let mut tree = ReleaseArena::new();

        // Pass 1: create nodes
        let indices = inputs
            .iter()
            .map(|input| tree.add_detached(input))
            .collect::<DomainResult<Vec<_>>>()?;

        // Pass 2: link nodes
        for (input, &idx) in inputs.iter().zip(&indices) {
            if input.is_root() {
                if let Some(root) = tree.root_version() {
                    return Err(DomainError::RootExists {
                        version: input.version.clone(),
                        root: root.to_string(),
                    });
                }
                tree.set_root(idx);
                continue;
            }
            let parent = tree
                .index_of(&input.parent)
                .ok_or_else(|| DomainError::ParentNotFound {
                    version: input.version.clone(),
                    parent: input.parent.clone(),
                })?;
            tree.link(idx, parent);
        }

        if !inputs.is_empty() && tree.root().is_none() {
            return Err(DomainError::NoRoot);
        }

        self.check_reachable(&tree, inputs)?;
        debug!(
            "built tree: nodes={} root={:?}",
            tree.len(),
            tree.root_version()
        );
        Ok(tree)
    }

    /// Every node must hang below the root; nodes that don't sit on a parent cycle.
    fn check_reachable(&mut self, tree: &ReleaseArena, inputs: &[ReleaseInput]) -> DomainResult<()> {
        self.visited.extend(tree.iter().map(|(idx, _)| idx));
        if self.visited.len() == tree.len() {
            return Ok(());
        }
        let stray = inputs
            .iter()
            .find(|input| {
                tree.index_of(&input.version)
                    .is_some_and(|idx| !self.visited.contains(&idx))
            })
            .map(|input| input.version.clone())
            .unwrap_or_default();
        Err(DomainError::CycleDetected(stray))
    }
}
