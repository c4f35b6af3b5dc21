//! Tree Materialization
//!
//! Builds the nested [`MaterializedNode`] output from the flat node list of
//! one tree. The nodes are placed in an index-addressed arena, walked
//! breadth-first with an explicit worklist, and assembled bottom-up by
//! visiting the breadth-first order in reverse. Nothing recurses on depth, so
//! arbitrarily deep hierarchies cannot exhaust the call stack.

use crate::models::{MaterializedNode, Node, NodeId, Tree};
use std::collections::{HashMap, VecDeque};

/// One arena slot: the node row plus indices of its children
struct ArenaNode {
    node: Node,
    children: Vec<usize>,
}

/// Index-addressed storage for one tree's nodes
struct NodeArena {
    slots: Vec<ArenaNode>,
    roots: Vec<usize>,
    orphans: usize,
}

impl NodeArena {
    /// Index `nodes` by id and link every node to its parent slot
    ///
    /// Input order is preserved for siblings. Nodes whose parent is not part
    /// of `nodes` are counted as orphans and left unreachable.
    fn build(nodes: Vec<Node>) -> Self {
        let index: HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (node.id, slot))
            .collect();

        let mut slots: Vec<ArenaNode> = nodes
            .into_iter()
            .map(|node| ArenaNode {
                node,
                children: Vec::new(),
            })
            .collect();

        let mut roots = Vec::new();
        let mut orphans = 0;
        for slot in 0..slots.len() {
            match slots[slot].node.parent_id {
                None => roots.push(slot),
                Some(parent_id) => match index.get(&parent_id) {
                    Some(&parent_slot) => slots[parent_slot].children.push(slot),
                    None => orphans += 1,
                },
            }
        }

        Self {
            slots,
            roots,
            orphans,
        }
    }

    /// Slots reachable from the roots, in breadth-first order
    fn breadth_first(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut queue: VecDeque<usize> = self.roots.iter().copied().collect();
        while let Some(slot) = queue.pop_front() {
            order.push(slot);
            queue.extend(self.slots[slot].children.iter().copied());
        }
        order
    }
}

/// Assemble the nested representation of `tree` from its flat node list
///
/// The returned root carries the tree's id and name; its children are the
/// tree's root nodes. Siblings keep the order they have in `nodes`.
///
/// ```rust
/// use treenodes_core::models::{Node, Tree};
/// use treenodes_core::services::materialize;
///
/// let tree = Tree::new(1, "T1");
/// let nodes = vec![
///     Node::new(10, "Root", 1, None),
///     Node::new(11, "Child", 1, Some(10)),
/// ];
///
/// let out = materialize(&tree, nodes);
/// assert_eq!(out.name, "T1");
/// assert_eq!(out.children[0].children[0].name, "Child");
/// ```
pub fn materialize(tree: &Tree, nodes: Vec<Node>) -> MaterializedNode {
    let arena = NodeArena::build(nodes);
    let order = arena.breadth_first();

    if order.len() < arena.slots.len() {
        tracing::warn!(
            "⚠️  Tree '{}' has {} node(s) unreachable from its roots ({} with a missing parent)",
            tree.name,
            arena.slots.len() - order.len(),
            arena.orphans
        );
    }

    // Children always come after their parent in breadth-first order, so
    // walking it backwards finishes every child before its parent.
    let mut built: Vec<Option<MaterializedNode>> = Vec::with_capacity(arena.slots.len());
    built.resize_with(arena.slots.len(), || None);

    for &slot in order.iter().rev() {
        let entry = &arena.slots[slot];
        let children = entry
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[slot] = Some(MaterializedNode {
            id: entry.node.id,
            name: entry.node.name.clone(),
            children,
        });
    }

    MaterializedNode {
        id: tree.id,
        name: tree.name.clone(),
        children: arena
            .roots
            .iter()
            .filter_map(|&root| built[root].take())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(node: &MaterializedNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_empty_tree_has_no_children() {
        let tree = Tree::new(1, "Empty");
        let out = materialize(&tree, Vec::new());
        assert_eq!(out, MaterializedNode::leaf(1, "Empty"));
    }

    #[test]
    fn test_nested_structure_is_preserved() {
        let tree = Tree::new(1, "T1");
        let nodes = vec![
            Node::new(10, "Root", 1, None),
            Node::new(11, "Child1", 1, Some(10)),
            Node::new(12, "Child2", 1, Some(10)),
            Node::new(13, "Grandchild", 1, Some(11)),
        ];

        let out = materialize(&tree, nodes);

        assert_eq!(out.id, 1);
        assert_eq!(names(&out), vec!["Root"]);
        let root = &out.children[0];
        assert_eq!(root.id, 10);
        assert_eq!(names(root), vec!["Child1", "Child2"]);
        let child1 = root.child("Child1").unwrap();
        assert_eq!(names(child1), vec!["Grandchild"]);
        assert!(root.child("Child2").unwrap().children.is_empty());
        assert_eq!(out.descendant_count(), 4);
    }

    #[test]
    fn test_multiple_roots_and_out_of_order_rows() {
        let tree = Tree::new(3, "Forest");
        // Child listed before its parent
        let nodes = vec![
            Node::new(5, "Leaf", 3, Some(2)),
            Node::new(1, "A", 3, None),
            Node::new(2, "B", 3, None),
        ];

        let out = materialize(&tree, nodes);
        assert_eq!(names(&out), vec!["A", "B"]);
        assert_eq!(names(out.child("B").unwrap()), vec!["Leaf"]);
    }

    #[test]
    fn test_orphans_are_dropped() {
        let tree = Tree::new(1, "T1");
        let nodes = vec![
            Node::new(1, "Root", 1, None),
            Node::new(2, "Orphan", 1, Some(99)),
        ];

        let out = materialize(&tree, nodes);
        assert_eq!(out.descendant_count(), 1);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let depth = 2_000;
        let tree = Tree::new(1, "Deep");
        let nodes: Vec<Node> = (1..=depth)
            .map(|id| {
                let parent = if id == 1 { None } else { Some(id - 1) };
                Node::new(id, format!("n{}", id), 1, parent)
            })
            .collect();

        let out = materialize(&tree, nodes);
        assert_eq!(out.descendant_count(), depth as usize);

        let mut cursor = &out;
        let mut levels = 0;
        while let Some(next) = cursor.children.first() {
            cursor = next;
            levels += 1;
        }
        assert_eq!(levels, depth as usize);
        assert_eq!(cursor.name, format!("n{}", depth));
    }
}
