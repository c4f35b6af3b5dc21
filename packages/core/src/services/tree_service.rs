//! Hierarchy Service
//!
//! Business logic over trees and nodes: get-or-create tree, create, rename
//! and delete nodes, and full-tree materialization.
//!
//! Each public operation runs as exactly one unit of work obtained from the
//! [`TreeStore`]. Uniqueness pre-checks and the writes they guard share that
//! unit of work, and a storage unique violation is reported as the same
//! [`TreeServiceError::NameConflict`] as a failed pre-check. Nothing is
//! visible to other callers until the final commit, so dropping an
//! operation's future leaves the store unchanged.

use crate::db::{TreeStore, TreeTransaction};
use crate::models::validation::{validate_name, validate_node_id};
use crate::models::{DeleteResult, MaterializedNode, NewNode, NodeId, Tree};
use crate::services::error::TreeServiceError;
use crate::services::materialize::materialize;
use std::sync::Arc;
use tracing::instrument;

/// Behavior switches for [`TreeService`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeServiceConfig {
    /// When true, [`TreeService::get_tree`] creates a missing tree instead of
    /// failing with `NotFound`
    pub create_tree_on_fetch: bool,
}

/// Core service for tree and node hierarchy operations
///
/// # Examples
///
/// ```no_run
/// use treenodes_core::db::{DatabaseService, TursoStore};
/// use treenodes_core::services::TreeService;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/test.db")).await?);
///     let service = TreeService::new(Arc::new(TursoStore::new(db)));
///
///     let root = service.create_node("T1", None, "Root").await?;
///     service.create_node("T1", Some(root), "Child").await?;
///
///     let tree = service.fetch_tree("T1").await?;
///     println!("{} has {} nodes", tree.name, tree.descendant_count());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct TreeService {
    store: Arc<dyn TreeStore>,
    config: TreeServiceConfig,
}

impl TreeService {
    /// Create a service with the default configuration (fetch-only `get_tree`)
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self::with_config(store, TreeServiceConfig::default())
    }

    pub fn with_config(store: Arc<dyn TreeStore>, config: TreeServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> TreeServiceConfig {
        self.config
    }

    /// Look up a tree by name, creating it if absent
    #[instrument(skip(self))]
    pub async fn get_or_create_tree(&self, tree_name: &str) -> Result<Tree, TreeServiceError> {
        validate_name("treeName", tree_name)?;

        let tx = self.store.begin_write().await?;
        let tree = get_or_create_in(&*tx, tree_name).await?;
        tx.commit().await?;
        Ok(tree)
    }

    /// Materialize an existing tree
    ///
    /// # Errors
    ///
    /// [`TreeServiceError::NotFound`] if no tree has this name.
    #[instrument(skip(self))]
    pub async fn fetch_tree(&self, tree_name: &str) -> Result<MaterializedNode, TreeServiceError> {
        validate_name("treeName", tree_name)?;

        let tx = self.store.begin_read().await?;
        let tree = tx
            .find_tree_by_name(tree_name)
            .await?
            .ok_or_else(|| TreeServiceError::tree_not_found(tree_name))?;
        let nodes = tx.nodes_in_tree(tree.id).await?;
        drop(tx);

        tracing::debug!("Materializing tree '{}' ({} nodes)", tree.name, nodes.len());
        Ok(materialize(&tree, nodes))
    }

    /// Materialize a tree, creating an empty one if it does not exist yet
    #[instrument(skip(self))]
    pub async fn fetch_or_create_tree(
        &self,
        tree_name: &str,
    ) -> Result<MaterializedNode, TreeServiceError> {
        validate_name("treeName", tree_name)?;

        let tx = self.store.begin_write().await?;
        let tree = get_or_create_in(&*tx, tree_name).await?;
        let nodes = tx.nodes_in_tree(tree.id).await?;
        tx.commit().await?;

        Ok(materialize(&tree, nodes))
    }

    /// Materialize a tree using the configured missing-tree behavior
    pub async fn get_tree(&self, tree_name: &str) -> Result<MaterializedNode, TreeServiceError> {
        if self.config.create_tree_on_fetch {
            self.fetch_or_create_tree(tree_name).await
        } else {
            self.fetch_tree(tree_name).await
        }
    }

    /// Create a node and return its id
    ///
    /// The tree is created if it does not exist. A given parent must exist in
    /// the same tree; a missing parent and a parent in another tree produce
    /// the same [`TreeServiceError::InvalidParent`].
    #[instrument(skip(self))]
    pub async fn create_node(
        &self,
        tree_name: &str,
        parent_node_id: Option<NodeId>,
        node_name: &str,
    ) -> Result<NodeId, TreeServiceError> {
        validate_name("treeName", tree_name)?;
        validate_name("nodeName", node_name)?;

        let tx = self.store.begin_write().await?;
        let tree = get_or_create_in(&*tx, tree_name).await?;

        if let Some(parent_id) = parent_node_id {
            if tx.find_node_in_tree(parent_id, tree.id).await?.is_none() {
                return Err(TreeServiceError::invalid_parent(parent_id));
            }
        }

        if tx
            .sibling_exists(tree.id, parent_node_id, node_name, None)
            .await?
        {
            return Err(TreeServiceError::sibling_name_conflict(node_name));
        }

        let node = tx
            .insert_node(NewNode::new(node_name, tree.id, parent_node_id))
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    TreeServiceError::sibling_name_conflict(node_name)
                } else {
                    e.into()
                }
            })?;
        tx.commit().await?;

        tracing::info!(
            "🌱 Created node {} '{}' in tree '{}'",
            node.id,
            node.name,
            tree.name
        );
        Ok(node.id)
    }

    /// Rename a node, keeping sibling names unique
    ///
    /// Renaming a node to its current name always succeeds.
    #[instrument(skip(self))]
    pub async fn rename_node(
        &self,
        node_id: NodeId,
        new_name: &str,
    ) -> Result<(), TreeServiceError> {
        validate_node_id("nodeId", node_id)?;
        validate_name("newNodeName", new_name)?;

        let tx = self.store.begin_write().await?;
        let node = tx
            .find_node(node_id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(node_id))?;

        if tx
            .sibling_exists(node.tree_id, node.parent_id, new_name, Some(node.id))
            .await?
        {
            return Err(TreeServiceError::sibling_name_conflict(new_name));
        }

        tx.update_node_name(node.id, new_name).await.map_err(|e| {
            if e.is_unique_violation() {
                TreeServiceError::sibling_name_conflict(new_name)
            } else {
                e.into()
            }
        })?;
        tx.commit().await?;

        tracing::info!("✏️  Renamed node {} '{}' -> '{}'", node.id, node.name, new_name);
        Ok(())
    }

    /// Delete a childless node
    ///
    /// Deleting a node that does not exist succeeds without writing anything.
    ///
    /// # Errors
    ///
    /// [`TreeServiceError::HasChildren`] if the node still has children; the
    /// node is left untouched.
    #[instrument(skip(self))]
    pub async fn delete_node(&self, node_id: NodeId) -> Result<DeleteResult, TreeServiceError> {
        let tx = self.store.begin_write().await?;

        let Some(node) = tx.find_node(node_id).await? else {
            tracing::debug!("Delete of missing node {} is a no-op", node_id);
            return Ok(DeleteResult::not_found());
        };

        if tx.has_children(node.id).await? {
            return Err(TreeServiceError::has_children(node.id));
        }

        tx.delete_node(node.id).await?;
        tx.commit().await?;

        tracing::info!("🗑️  Deleted node {} '{}'", node.id, node.name);
        Ok(DeleteResult::existed())
    }
}

/// Find or insert a tree inside an open unit of work
///
/// Losing an insert race to a concurrent creator is resolved by re-reading
/// the winner's row.
async fn get_or_create_in(
    tx: &dyn TreeTransaction,
    tree_name: &str,
) -> Result<Tree, TreeServiceError> {
    if let Some(tree) = tx.find_tree_by_name(tree_name).await? {
        return Ok(tree);
    }

    match tx.create_tree(tree_name).await {
        Ok(tree) => {
            tracing::info!("🌳 Created tree {} '{}'", tree.id, tree.name);
            Ok(tree)
        }
        Err(e) if e.is_unique_violation() => {
            tracing::debug!("Tree '{}' was created concurrently, re-reading", tree_name);
            tx.find_tree_by_name(tree_name)
                .await?
                .ok_or_else(|| TreeServiceError::tree_name_conflict(tree_name))
        }
        Err(e) => Err(e.into()),
    }
}
