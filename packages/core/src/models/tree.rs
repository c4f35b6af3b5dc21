//! Tree Data Structure
//!
//! A tree is the named root-level grouping that owns a node hierarchy.
//! Trees are created implicitly the first time a name is referenced and are
//! never deleted by the service layer.

use serde::{Deserialize, Serialize};

/// Surrogate key of a tree row
pub type TreeId = i64;

/// A named tree
///
/// `name` is globally unique and compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: TreeId,
    pub name: String,
}

impl Tree {
    pub fn new(id: TreeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
