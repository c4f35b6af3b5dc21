//! TreeStore Trait - Repository Abstraction Layer
//!
//! This module defines the repository seam between the hierarchy service
//! (business logic) and the libsql implementation.
//!
//! # Architecture
//!
//! - **Unit of work**: Every service call opens exactly one [`TreeTransaction`]
//!   through [`TreeStore::begin_write`] or [`TreeStore::begin_read`] and runs
//!   all of its reads and writes through it.
//! - **All-or-nothing**: Writes only become visible after
//!   [`TreeTransaction::commit`]. Dropping a transaction without committing
//!   (including when the owning future is cancelled) discards them.
//! - **Conflicts are typed**: A UNIQUE violation on insert or update surfaces
//!   as [`DatabaseError::UniqueViolation`] so callers can translate it into the
//!   same error as their own pre-check.
//!
//! # Examples
//!
//! ```rust,no_run
//! use treenodes_core::db::{DatabaseService, TreeStore, TursoStore};
//! use treenodes_core::models::NewNode;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/test.db")).await?);
//!     let store: Arc<dyn TreeStore> = Arc::new(TursoStore::new(db));
//!
//!     let tx = store.begin_write().await?;
//!     let tree = tx.create_tree("T1").await?;
//!     let root = tx.insert_node(NewNode::new("Root", tree.id, None)).await?;
//!     tx.commit().await?;
//!
//!     println!("created node {}", root.id);
//!     Ok(())
//! }
//! ```

use crate::db::error::DatabaseError;
use crate::models::{NewNode, Node, NodeId, Tree, TreeId};
use async_trait::async_trait;

/// Factory for units of work against the tree store
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every concurrent request.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Open a unit of work that will write
    ///
    /// The storage write lock is taken immediately, so a uniqueness check made
    /// through the returned transaction cannot be invalidated by another
    /// writer before this transaction commits or is dropped.
    async fn begin_write(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError>;

    /// Open a read-only unit of work with a consistent snapshot
    async fn begin_read(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError>;
}

/// One transaction-scoped unit of work over trees and nodes
#[async_trait]
pub trait TreeTransaction: Send + Sync {
    //
    // TREES
    //

    /// Look up a tree by exact (case-sensitive) name
    async fn find_tree_by_name(&self, name: &str) -> Result<Option<Tree>, DatabaseError>;

    /// Insert a tree
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UniqueViolation`] if the name already exists by the
    /// time of insert. Callers should treat this as "someone else created it"
    /// and re-fetch.
    async fn create_tree(&self, name: &str) -> Result<Tree, DatabaseError>;

    //
    // NODES
    //

    /// Look up a node by id, in any tree
    async fn find_node(&self, id: NodeId) -> Result<Option<Node>, DatabaseError>;

    /// Look up a node by id, only if it belongs to `tree_id`
    async fn find_node_in_tree(
        &self,
        id: NodeId,
        tree_id: TreeId,
    ) -> Result<Option<Node>, DatabaseError>;

    /// Whether a sibling named `name` exists under `(tree_id, parent_id)`
    ///
    /// `parent_id = None` addresses root siblings. `exclude_id` skips one node,
    /// which lets a rename to the current name pass.
    async fn sibling_exists(
        &self,
        tree_id: TreeId,
        parent_id: Option<NodeId>,
        name: &str,
        exclude_id: Option<NodeId>,
    ) -> Result<bool, DatabaseError>;

    /// Direct children of a node, ordered by id
    async fn children_of(&self, node_id: NodeId) -> Result<Vec<Node>, DatabaseError>;

    /// Whether a node has at least one child
    async fn has_children(&self, node_id: NodeId) -> Result<bool, DatabaseError>;

    /// Every node of a tree in one round trip, ordered by id
    async fn nodes_in_tree(&self, tree_id: TreeId) -> Result<Vec<Node>, DatabaseError>;

    /// Insert a node and return it with its assigned id
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UniqueViolation`] if a sibling with the same name
    /// already exists.
    async fn insert_node(&self, node: NewNode) -> Result<Node, DatabaseError>;

    /// Change a node's name, returning the number of rows updated
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UniqueViolation`] if a sibling already has the name.
    async fn update_node_name(&self, id: NodeId, name: &str) -> Result<u64, DatabaseError>;

    /// Delete a node row, returning the number of rows deleted
    async fn delete_node(&self, id: NodeId) -> Result<u64, DatabaseError>;

    //
    // LIFECYCLE
    //

    /// Make every write of this unit of work visible atomically
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;
}
