use generational_arena::Index;
use termtree::Tree;

use crate::domain::arena::ReleaseArena;

/// Conversion into a printable `termtree` hierarchy.
pub trait TreeRender {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeRender for ReleaseArena {
    fn to_tree_string(&self) -> Tree<String> {
        let Some(root) = self.root().and_then(|idx| self.get_node(idx).map(|n| (idx, n))) else {
            return Tree::new("Empty tree".to_string());
        };

        fn build_tree(arena: &ReleaseArena, node_idx: Index, parent_tree: &mut Tree<String>) {
            if let Some(node) = arena.get_node(node_idx) {
                for &child_idx in &node.children {
                    if let Some(child) = arena.get_node(child_idx) {
                        let mut child_tree = Tree::new(child.to_string());
                        build_tree(arena, child_idx, &mut child_tree);
                        parent_tree.push(child_tree);
                    }
                }
            }
        }

        let (root_idx, root_node) = root;
        let mut tree = Tree::new(root_node.to_string());
        build_tree(self, root_idx, &mut tree);
        tree
    }
}
