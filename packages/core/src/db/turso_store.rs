//! TursoStore - TreeStore Implementation for the libsql Backend
//!
//! This module implements the `TreeStore` trait on top of `DatabaseService`.
//!
//! # Design Principles
//!
//! 1. **One connection per unit of work**: `begin_*` opens a fresh connection
//!    and wraps it in a transaction; nothing is shared between requests
//! 2. **Immediate write transactions**: `BEGIN IMMEDIATE` takes the write lock
//!    up front, so check-then-write sequences are serialized across writers
//! 3. **Row Conversion**: Handles libsql::Row → model conversion in one place
//! 4. **Rollback on drop**: An uncommitted libsql transaction is rolled back
//!    when it is dropped together with its connection

use crate::db::error::DatabaseError;
use crate::db::tree_store::{TreeStore, TreeTransaction};
use crate::db::DatabaseService;
use crate::models::{NewNode, Node, NodeId, Tree, TreeId};
use async_trait::async_trait;
use libsql::{Row, Rows, TransactionBehavior};
use std::sync::Arc;

/// TursoStore implements TreeStore for the libsql backend
pub struct TursoStore {
    /// Underlying database service
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapper
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use treenodes_core::db::{TursoStore, DatabaseService};
    /// # use std::sync::Arc;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Arc::new(DatabaseService::new(PathBuf::from("./test.db")).await?);
    /// let store = TursoStore::new(db);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    async fn begin(
        &self,
        behavior: TransactionBehavior,
    ) -> Result<Box<dyn TreeTransaction>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        let tx = conn
            .transaction_with_behavior(behavior)
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
            })?;

        Ok(Box::new(TursoTransaction { tx }))
    }
}

#[async_trait]
impl TreeStore for TursoStore {
    async fn begin_write(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError> {
        self.begin(TransactionBehavior::Immediate).await
    }

    async fn begin_read(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError> {
        self.begin(TransactionBehavior::Deferred).await
    }
}

/// A libsql transaction holding one unit of work
pub struct TursoTransaction {
    tx: libsql::Transaction,
}

/// Convert libsql::Row to Tree model
///
/// Expected columns (in order): id (INTEGER), name (TEXT)
fn row_to_tree(row: &Row) -> Result<Tree, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::row_decode(format!("trees.id: {}", e)))?;
    let name: String = row
        .get(1)
        .map_err(|e| DatabaseError::row_decode(format!("trees.name: {}", e)))?;
    Ok(Tree { id, name })
}

/// Convert libsql::Row to Node model
///
/// Expected columns (in order):
/// - id (INTEGER)
/// - name (TEXT)
/// - tree_id (INTEGER)
/// - parent_id (INTEGER, nullable)
fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::row_decode(format!("nodes.id: {}", e)))?;
    let name: String = row
        .get(1)
        .map_err(|e| DatabaseError::row_decode(format!("nodes.name: {}", e)))?;
    let tree_id: i64 = row
        .get(2)
        .map_err(|e| DatabaseError::row_decode(format!("nodes.tree_id: {}", e)))?;
    let parent_id: Option<i64> = row
        .get(3)
        .map_err(|e| DatabaseError::row_decode(format!("nodes.parent_id: {}", e)))?;
    Ok(Node {
        id,
        name,
        tree_id,
        parent_id,
    })
}

async fn collect_nodes(mut rows: Rows) -> Result<Vec<Node>, DatabaseError> {
    let mut nodes = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        nodes.push(row_to_node(&row)?);
    }
    Ok(nodes)
}

async fn first_node(mut rows: Rows) -> Result<Option<Node>, DatabaseError> {
    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        Some(row) => Ok(Some(row_to_node(&row)?)),
        None => Ok(None),
    }
}

async fn exists(mut rows: Rows) -> Result<bool, DatabaseError> {
    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        .ok_or_else(|| DatabaseError::sql_execution("EXISTS query returned no row"))?;
    let flag: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::row_decode(format!("exists flag: {}", e)))?;
    Ok(flag != 0)
}

#[async_trait]
impl TreeTransaction for TursoTransaction {
    async fn find_tree_by_name(&self, name: &str) -> Result<Option<Tree>, DatabaseError> {
        let mut rows = self
            .tx
            .query("SELECT id, name FROM trees WHERE name = ?", [name])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to query tree: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_tree(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_tree(&self, name: &str) -> Result<Tree, DatabaseError> {
        self.tx
            .execute("INSERT INTO trees (name) VALUES (?)", [name])
            .await
            .map_err(|e| DatabaseError::from_write("Failed to insert tree", e))?;

        Ok(Tree::new(self.tx.last_insert_rowid(), name))
    }

    async fn find_node(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        let rows = self
            .tx
            .query(
                "SELECT id, name, tree_id, parent_id FROM nodes WHERE id = ?",
                [id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to query node: {}", e)))?;

        first_node(rows).await
    }

    async fn find_node_in_tree(
        &self,
        id: NodeId,
        tree_id: TreeId,
    ) -> Result<Option<Node>, DatabaseError> {
        let rows = self
            .tx
            .query(
                "SELECT id, name, tree_id, parent_id FROM nodes WHERE id = ? AND tree_id = ?",
                (id, tree_id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to query node: {}", e)))?;

        first_node(rows).await
    }

    async fn sibling_exists(
        &self,
        tree_id: TreeId,
        parent_id: Option<NodeId>,
        name: &str,
        exclude_id: Option<NodeId>,
    ) -> Result<bool, DatabaseError> {
        // `IS` compares NULL parent ids as equal, covering root siblings
        let rows = self
            .tx
            .query(
                "SELECT EXISTS (
                    SELECT 1 FROM nodes
                    WHERE tree_id = ?1 AND parent_id IS ?2 AND name = ?3
                      AND (?4 IS NULL OR id <> ?4)
                 )",
                (tree_id, parent_id, name, exclude_id),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to check sibling names: {}", e))
            })?;

        exists(rows).await
    }

    async fn children_of(&self, node_id: NodeId) -> Result<Vec<Node>, DatabaseError> {
        let rows = self
            .tx
            .query(
                "SELECT id, name, tree_id, parent_id FROM nodes WHERE parent_id = ? ORDER BY id",
                [node_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to query children: {}", e))
            })?;

        collect_nodes(rows).await
    }

    async fn has_children(&self, node_id: NodeId) -> Result<bool, DatabaseError> {
        let rows = self
            .tx
            .query(
                "SELECT EXISTS (SELECT 1 FROM nodes WHERE parent_id = ?)",
                [node_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to check children: {}", e))
            })?;

        exists(rows).await
    }

    async fn nodes_in_tree(&self, tree_id: TreeId) -> Result<Vec<Node>, DatabaseError> {
        let rows = self
            .tx
            .query(
                "SELECT id, name, tree_id, parent_id FROM nodes WHERE tree_id = ? ORDER BY id",
                [tree_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to query tree nodes: {}", e))
            })?;

        collect_nodes(rows).await
    }

    async fn insert_node(&self, node: NewNode) -> Result<Node, DatabaseError> {
        self.tx
            .execute(
                "INSERT INTO nodes (name, tree_id, parent_id) VALUES (?, ?, ?)",
                (node.name.as_str(), node.tree_id, node.parent_id),
            )
            .await
            .map_err(|e| DatabaseError::from_write("Failed to insert node", e))?;

        Ok(Node {
            id: self.tx.last_insert_rowid(),
            name: node.name,
            tree_id: node.tree_id,
            parent_id: node.parent_id,
        })
    }

    async fn update_node_name(&self, id: NodeId, name: &str) -> Result<u64, DatabaseError> {
        self.tx
            .execute("UPDATE nodes SET name = ? WHERE id = ?", (name, id))
            .await
            .map_err(|e| DatabaseError::from_write("Failed to rename node", e))
    }

    async fn delete_node(&self, id: NodeId) -> Result<u64, DatabaseError> {
        self.tx
            .execute("DELETE FROM nodes WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete node: {}", e)))
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (TursoStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
        (TursoStore::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_find_tree() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin_write().await.unwrap();
        let created = tx.create_tree("T1").await.unwrap();
        tx.commit().await.unwrap();

        let tx = store.begin_read().await.unwrap();
        let found = tx.find_tree_by_name("T1").await.unwrap();
        assert_eq!(found, Some(created));
        assert!(tx.find_tree_by_name("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tree_name_is_unique_violation() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin_write().await.unwrap();
        tx.create_tree("T1").await.unwrap();
        let err = tx.create_tree("T1").await.unwrap_err();
        assert!(err.is_unique_violation());

        // The failed statement does not poison the unit of work
        tx.create_tree("T2").await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded_on_drop() {
        let (store, _temp) = create_test_store().await;

        {
            let tx = store.begin_write().await.unwrap();
            let tree = tx.create_tree("T1").await.unwrap();
            tx.insert_node(NewNode::new("Root", tree.id, None))
                .await
                .unwrap();
            // dropped without commit
        }

        let tx = store.begin_read().await.unwrap();
        assert!(tx.find_tree_by_name("T1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sibling_exists_scopes_by_parent_and_excludes_self() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin_write().await.unwrap();
        let tree = tx.create_tree("T1").await.unwrap();
        let root = tx
            .insert_node(NewNode::new("Root", tree.id, None))
            .await
            .unwrap();
        let child = tx
            .insert_node(NewNode::new("Child", tree.id, Some(root.id)))
            .await
            .unwrap();

        // Root siblings (NULL parent)
        assert!(tx
            .sibling_exists(tree.id, None, "Root", None)
            .await
            .unwrap());
        assert!(!tx
            .sibling_exists(tree.id, None, "Root", Some(root.id))
            .await
            .unwrap());

        // Children of Root
        assert!(tx
            .sibling_exists(tree.id, Some(root.id), "Child", None)
            .await
            .unwrap());
        assert!(!tx
            .sibling_exists(tree.id, Some(root.id), "Child", Some(child.id))
            .await
            .unwrap());
        assert!(!tx
            .sibling_exists(tree.id, None, "Child", None)
            .await
            .unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_sibling_insert_is_unique_violation() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin_write().await.unwrap();
        let tree = tx.create_tree("T1").await.unwrap();
        tx.insert_node(NewNode::new("Root", tree.id, None))
            .await
            .unwrap();
        let err = tx
            .insert_node(NewNode::new("Root", tree.id, None))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_find_node_in_tree_is_scoped() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin_write().await.unwrap();
        let tree_a = tx.create_tree("A").await.unwrap();
        let tree_b = tx.create_tree("B").await.unwrap();
        let node = tx
            .insert_node(NewNode::new("Root", tree_a.id, None))
            .await
            .unwrap();

        assert_eq!(tx.find_node(node.id).await.unwrap(), Some(node.clone()));
        assert_eq!(
            tx.find_node_in_tree(node.id, tree_a.id).await.unwrap(),
            Some(node.clone())
        );
        assert!(tx
            .find_node_in_tree(node.id, tree_b.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_children_and_tree_listing_are_ordered_by_id() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin_write().await.unwrap();
        let tree = tx.create_tree("T1").await.unwrap();
        let root = tx
            .insert_node(NewNode::new("Root", tree.id, None))
            .await
            .unwrap();
        let b = tx
            .insert_node(NewNode::new("B", tree.id, Some(root.id)))
            .await
            .unwrap();
        let a = tx
            .insert_node(NewNode::new("A", tree.id, Some(root.id)))
            .await
            .unwrap();

        let children = tx.children_of(root.id).await.unwrap();
        assert_eq!(children, vec![b.clone(), a.clone()]);
        assert!(tx.has_children(root.id).await.unwrap());
        assert!(!tx.has_children(a.id).await.unwrap());

        let all = tx.nodes_in_tree(tree.id).await.unwrap();
        assert_eq!(all, vec![root, b, a]);
    }

    #[tokio::test]
    async fn test_rename_and_delete_report_affected_rows() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin_write().await.unwrap();
        let tree = tx.create_tree("T1").await.unwrap();
        let node = tx
            .insert_node(NewNode::new("Old", tree.id, None))
            .await
            .unwrap();

        assert_eq!(tx.update_node_name(node.id, "New").await.unwrap(), 1);
        assert_eq!(
            tx.find_node(node.id).await.unwrap().map(|n| n.name),
            Some("New".to_string())
        );
        assert_eq!(tx.delete_node(node.id).await.unwrap(), 1);
        assert_eq!(tx.delete_node(node.id).await.unwrap(), 0);
        tx.commit().await.unwrap();
    }
}
