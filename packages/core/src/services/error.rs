//! Service Layer Error Types
//!
//! This module defines error types for hierarchy operations. Every variant
//! except [`TreeServiceError::Storage`] carries a message that is safe to show
//! to an API caller; storage failures display an opaque message and keep the
//! underlying cause as their error source.

use crate::db::DatabaseError;
use crate::models::{NodeId, ValidationError};
use thiserror::Error;

/// Hierarchy service errors
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// Referenced tree or node does not exist
    #[error("{message}")]
    NotFound { message: String },

    /// Parent is missing or belongs to another tree
    #[error("Parent node not found in the specified tree")]
    InvalidParent { parent_id: NodeId },

    /// Sibling-name or tree-name uniqueness violated
    #[error("{message}")]
    NameConflict { message: String },

    /// Delete blocked by existing children
    #[error("You have to delete all children nodes first")]
    HasChildren { node_id: NodeId },

    /// Input rejected before touching storage
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Underlying persistence failure
    #[error("Storage operation failed")]
    Storage(#[from] DatabaseError),
}

impl TreeServiceError {
    /// Create a tree not found error
    pub fn tree_not_found(name: &str) -> Self {
        Self::NotFound {
            message: format!("Tree '{}' not found", name),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NotFound {
            message: format!("Node with ID = {} was not found", id),
        }
    }

    /// Create an invalid parent error
    pub fn invalid_parent(parent_id: NodeId) -> Self {
        Self::InvalidParent { parent_id }
    }

    /// Create a sibling name conflict error
    pub fn sibling_name_conflict(name: &str) -> Self {
        Self::NameConflict {
            message: format!("Node name '{}' must be unique among siblings", name),
        }
    }

    /// Create a tree name conflict error
    pub fn tree_name_conflict(name: &str) -> Self {
        Self::NameConflict {
            message: format!("Tree name '{}' already exists", name),
        }
    }

    /// Create a has-children error
    pub fn has_children(node_id: NodeId) -> Self {
        Self::HasChildren { node_id }
    }

    /// Stable name of the error kind, used as the journal's exception type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::InvalidParent { .. } => "InvalidParentError",
            Self::NameConflict { .. } => "NameConflictError",
            Self::HasChildren { .. } => "HasChildrenError",
            Self::Validation(_) => "ValidationError",
            Self::Storage(_) => "StorageError",
        }
    }

    /// Whether the display message may be shown to the caller verbatim
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_user_facing_messages_do_not_leak_storage_details() {
        let err = TreeServiceError::sibling_name_conflict("Child");
        assert_eq!(err.to_string(), "Node name 'Child' must be unique among siblings");
        assert!(err.is_user_facing());

        let err = TreeServiceError::invalid_parent(42);
        assert_eq!(err.to_string(), "Parent node not found in the specified tree");

        let err = TreeServiceError::has_children(7);
        assert_eq!(err.kind(), "HasChildrenError");
    }

    #[test]
    fn test_storage_error_is_opaque_but_keeps_source() {
        let err: TreeServiceError = DatabaseError::sql_execution("disk I/O error").into();
        assert_eq!(err.to_string(), "Storage operation failed");
        assert!(!err.is_user_facing());
        assert_eq!(err.kind(), "StorageError");

        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("disk I/O error"));
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err: TreeServiceError = ValidationError::EmptyName { field: "nodeName" }.into();
        assert_eq!(err.to_string(), "'nodeName' must not be empty");
        assert_eq!(err.kind(), "ValidationError");
    }
}
