//! Node Data Structures
//!
//! This module defines the `Node` row model, the insert payload used by the
//! repository, and the nested `MaterializedNode` returned when a whole tree is
//! fetched.
//!
//! # Examples
//!
//! ```rust
//! use treenodes_core::models::{MaterializedNode, Node};
//!
//! let root = Node::new(1, "Root", 7, None);
//! assert!(root.is_root());
//!
//! let child = Node::new(2, "Child", 7, Some(root.id));
//! assert!(!child.is_root());
//!
//! let tree = MaterializedNode::leaf(7, "T1");
//! assert!(tree.children.is_empty());
//! ```

use crate::models::tree::TreeId;
use serde::{Deserialize, Serialize};

/// Surrogate key of a node row
pub type NodeId = i64;

/// A named entry in a tree hierarchy
///
/// # Fields
///
/// - `id`: Surrogate key assigned by storage
/// - `name`: Unique among siblings (same `tree_id` and `parent_id`)
/// - `tree_id`: Owning tree, immutable after creation
/// - `parent_id`: Parent node in the same tree, `None` for root nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub tree_id: TreeId,
    pub parent_id: Option<NodeId>,
}

impl Node {
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        tree_id: TreeId,
        parent_id: Option<NodeId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            tree_id,
            parent_id,
        }
    }

    /// Root nodes are the ones without a parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Insert payload for a node that has no id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub name: String,
    pub tree_id: TreeId,
    pub parent_id: Option<NodeId>,
}

impl NewNode {
    pub fn new(name: impl Into<String>, tree_id: TreeId, parent_id: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            tree_id,
            parent_id,
        }
    }
}

/// Nested output representation of a tree
///
/// The top-level value carries the tree's id and name; every descendant
/// carries a node's id and name. `children` is always present, even when
/// empty, so clients can walk the structure without null checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedNode {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub children: Vec<MaterializedNode>,
}

impl MaterializedNode {
    /// A node without children
    pub fn leaf(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Find a direct child by name
    pub fn child(&self, name: &str) -> Option<&MaterializedNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Total number of nodes below this one
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&MaterializedNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Result of a delete operation
///
/// Deletes are idempotent: removing a node that does not exist succeeds with
/// `existed = false`.
///
/// ```rust
/// use treenodes_core::models::DeleteResult;
///
/// let result = DeleteResult::existed();
/// assert!(result.existed);
///
/// let result = DeleteResult::not_found();
/// assert!(!result.existed);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    /// Whether the node existed before deletion
    pub existed: bool,
}

impl DeleteResult {
    /// Create a DeleteResult indicating the node existed
    pub fn existed() -> Self {
        Self { existed: true }
    }

    /// Create a DeleteResult indicating the node didn't exist
    pub fn not_found() -> Self {
        Self { existed: false }
    }
}
