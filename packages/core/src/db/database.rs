//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for TreeNodes' relational storage.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging so readers never block the writer
//! - **Foreign keys**: Enabled on every connection for referential integrity
//! - **Constraints as backstop**: Tree-name and sibling-name uniqueness are
//!   enforced by UNIQUE indexes, independent of service-level checks
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** It configures
//! the busy timeout and foreign keys on the new connection, so concurrent
//! writers wait for the lock instead of failing with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use treenodes_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/treenodes.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use crate::models::JournalRecord;
use chrono::{DateTime, Utc};
use libsql::{Builder, Database, TransactionBehavior};
use std::path::PathBuf;
use std::sync::Arc;

/// Busy timeout applied to every connection, in milliseconds
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Schema statements, executed in order on startup
///
/// The sibling-name index uses `COALESCE(parent_id, 0)` because SQLite treats
/// NULLs as distinct in unique indexes; without it two root nodes of the same
/// tree could share a name. Ids start at 1, so 0 never collides with a real
/// parent.
const SCHEMA: &[(&str, &str)] = &[
    (
        "trees table",
        "CREATE TABLE IF NOT EXISTS trees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) <= 200),
            CONSTRAINT uq_trees_name UNIQUE (name)
        )",
    ),
    (
        "nodes table",
        "CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) <= 200),
            tree_id INTEGER NOT NULL,
            parent_id INTEGER,
            -- Tree deletion cascades to its nodes (backstop only)
            FOREIGN KEY (tree_id) REFERENCES trees(id) ON DELETE CASCADE,
            -- Parent must live in the same tree; deletion cascades (backstop only)
            FOREIGN KEY (parent_id, tree_id) REFERENCES nodes(id, tree_id) ON DELETE CASCADE
        )",
    ),
    (
        "index 'idx_nodes_id_tree'",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_id_tree ON nodes(id, tree_id)",
    ),
    (
        "index 'idx_nodes_sibling_name'",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_sibling_name
         ON nodes(tree_id, COALESCE(parent_id, 0), name)",
    ),
    (
        "index 'idx_nodes_parent'",
        "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
    ),
    (
        "journal table",
        "CREATE TABLE IF NOT EXISTS journal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            request_path TEXT NOT NULL DEFAULT '',
            http_method TEXT NOT NULL DEFAULT '',
            query_string TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL DEFAULT '',
            exception_type TEXT NOT NULL DEFAULT '',
            message TEXT NOT NULL DEFAULT '',
            stack_trace TEXT NOT NULL DEFAULT '',
            CONSTRAINT uq_journal_event_id UNIQUE (event_id)
        )",
    ),
    (
        "index 'idx_journal_created'",
        "CREATE INDEX IF NOT EXISTS idx_journal_created ON journal(created_at)",
    ),
];

/// Columns selected for journal rows, in `row_to_journal_record` order
const JOURNAL_COLUMNS: &str = "id, event_id, created_at, request_path, http_method, \
     query_string, body, exception_type, message, stack_trace";

/// Parameters for journal insertion (avoids too-many-arguments lint)
pub struct DbInsertJournalParams<'a> {
    pub event_id: i64,
    pub created_at: &'a str,
    pub request_path: &'a str,
    pub http_method: &'a str,
    pub query_string: &'a str,
    pub body: &'a str,
    pub exception_type: &'a str,
    pub message: &'a str,
    pub stack_trace: &'a str,
}

/// Database service for managing the libsql handle and schema
///
/// Cloning is cheap; all clones share the same underlying database.
///
/// # Examples
///
/// ```no_run
/// use treenodes_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_service = DatabaseService::new(PathBuf::from("/path/to/treenodes.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;
        tracing::debug!("📦 Database ready at {}", service.db_path.display());

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements may return rows, so we must use query() instead of
    /// execute(). The first row is pulled so the statement is actually stepped.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        rows.next().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent: safe to call on an existing database.
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // WAL is a property of the database file, set once
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        for (label, statement) in SCHEMA {
            conn.execute(statement, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!("Failed to create {}: {}", label, e))
            })?;
        }

        Ok(())
    }

    /// Get a connection with busy timeout and foreign keys configured
    ///
    /// Every unit of work opens its own connection through this method, so
    /// no connection is ever shared between concurrent operations.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.db.connect().map_err(DatabaseError::LibsqlError)?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
            .await?;
        // Per-connection setting; has no effect inside a transaction
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    //
    // JOURNAL OPERATIONS
    // Raw SQL for the failure journal. Filters and id generation live in
    // JournalService.
    //

    /// Append a journal record, returning its row id
    ///
    /// A duplicate `event_id` is reported as `DatabaseError::UniqueViolation`.
    pub async fn db_insert_journal_record(
        &self,
        params: DbInsertJournalParams<'_>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO journal (event_id, created_at, request_path, http_method, query_string, body, exception_type, message, stack_trace)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                params.event_id,
                params.created_at,
                params.request_path,
                params.http_method,
                params.query_string,
                params.body,
                params.exception_type,
                params.message,
                params.stack_trace,
            ),
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to insert journal record", e))?;

        Ok(conn.last_insert_rowid())
    }

    /// Fetch a journal record by its event id
    pub async fn db_get_journal_by_event_id(
        &self,
        event_id: i64,
    ) -> Result<Option<JournalRecord>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM journal WHERE event_id = ?", JOURNAL_COLUMNS),
                [event_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to query journal record: {}", e))
            })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_journal_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Count and list journal records matching a WHERE clause, newest first
    ///
    /// Both statements run in one deferred read transaction, so `count` and
    /// the returned page come from the same snapshot. `where_clause` is built
    /// by the caller from fixed fragments; only `params` carry user input.
    pub async fn db_get_journal_page(
        &self,
        where_clause: &str,
        params: Vec<libsql::Value>,
        skip: u32,
        take: u32,
    ) -> Result<(u64, Vec<JournalRecord>), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
            })?;

        let mut rows = tx
            .query(
                &format!("SELECT COUNT(*) FROM journal {}", where_clause),
                params.clone(),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to count journal records: {}", e))
            })?;
        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .ok_or_else(|| DatabaseError::sql_execution("COUNT(*) returned no row"))?;
        let count: i64 = row
            .get(0)
            .map_err(|e| DatabaseError::row_decode(format!("journal count: {}", e)))?;
        drop(rows);

        let mut page_params = params;
        page_params.push(libsql::Value::Integer(i64::from(take)));
        page_params.push(libsql::Value::Integer(i64::from(skip)));

        let mut rows = tx
            .query(
                &format!(
                    "SELECT {} FROM journal {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                    JOURNAL_COLUMNS, where_clause
                ),
                page_params,
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to list journal records: {}", e))
            })?;

        // Rows are views onto the statement cursor; decode before stepping again
        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            records.push(row_to_journal_record(&row)?);
        }
        drop(rows);

        tx.commit().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e))
        })?;

        Ok((count.max(0) as u64, records))
    }
}

/// Convert a libsql::Row selected with [`JOURNAL_COLUMNS`] to a JournalRecord
fn row_to_journal_record(row: &libsql::Row) -> Result<JournalRecord, DatabaseError> {
    let text = |idx: i32, column: &str| -> Result<String, DatabaseError> {
        row.get::<Option<String>>(idx)
            .map(Option::unwrap_or_default)
            .map_err(|e| DatabaseError::row_decode(format!("journal.{}: {}", column, e)))
    };

    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::row_decode(format!("journal.id: {}", e)))?;
    let event_id: i64 = row
        .get(1)
        .map_err(|e| DatabaseError::row_decode(format!("journal.event_id: {}", e)))?;
    let created_at_raw = text(2, "created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::row_decode(format!(
                "journal.created_at '{}': {}",
                created_at_raw, e
            ))
        })?;

    Ok(JournalRecord {
        id,
        event_id,
        created_at,
        request_path: text(3, "request_path")?,
        http_method: text(4, "http_method")?,
        query_string: text(5, "query_string")?,
        body: text(6, "body")?,
        exception_type: text(7, "exception_type")?,
        message: text(8, "message")?,
        stack_trace: text(9, "stack_trace")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("dir").join("test.db");

        let service = DatabaseService::new(db_path.clone()).await.unwrap();

        assert!(db_path.exists());
        assert_eq!(service.db_path, db_path);
    }

    #[tokio::test]
    async fn test_schema_initialization_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let first = DatabaseService::new(db_path.clone()).await.unwrap();
        drop(first);
        let second = DatabaseService::new(db_path).await.unwrap();

        let conn = second.connect_with_timeout().await.unwrap();
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('trees', 'nodes', 'journal')",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let tables: i64 = row.get(0).unwrap();
        assert_eq!(tables, 3);
    }

    #[tokio::test]
    async fn test_root_sibling_names_are_unique_at_storage_level() {
        let temp_dir = TempDir::new().unwrap();
        let service = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let conn = service.connect_with_timeout().await.unwrap();

        conn.execute("INSERT INTO trees (name) VALUES ('T1')", ())
            .await
            .unwrap();
        conn.execute(
            "INSERT INTO nodes (name, tree_id, parent_id) VALUES ('Root', 1, NULL)",
            (),
        )
        .await
        .unwrap();

        let err = conn
            .execute(
                "INSERT INTO nodes (name, tree_id, parent_id) VALUES ('Root', 1, NULL)",
                (),
            )
            .await
            .unwrap_err();
        assert!(DatabaseError::from_write("insert", err).is_unique_violation());
    }

    #[tokio::test]
    async fn test_cross_tree_parent_rejected_at_storage_level() {
        let temp_dir = TempDir::new().unwrap();
        let service = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let conn = service.connect_with_timeout().await.unwrap();

        conn.execute("INSERT INTO trees (name) VALUES ('A'), ('B')", ())
            .await
            .unwrap();
        conn.execute(
            "INSERT INTO nodes (name, tree_id, parent_id) VALUES ('RootA', 1, NULL)",
            (),
        )
        .await
        .unwrap();

        let result = conn
            .execute(
                "INSERT INTO nodes (name, tree_id, parent_id) VALUES ('Child', 2, 1)",
                (),
            )
            .await;
        assert!(result.is_err());
    }

    fn journal_params(event_id: i64, created_at: &str) -> DbInsertJournalParams<'_> {
        DbInsertJournalParams {
            event_id,
            created_at,
            request_path: "/api/trees/T1",
            http_method: "GET",
            query_string: "",
            body: "",
            exception_type: "NotFoundError",
            message: "Tree 'T1' not found",
            stack_trace: "",
        }
    }

    #[tokio::test]
    async fn test_journal_page_count_and_items_share_a_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let service = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();

        for (event_id, created_at) in [
            (1, "2026-01-01T00:00:01.000000Z"),
            (2, "2026-01-01T00:00:02.000000Z"),
            (3, "2026-01-01T00:00:03.000000Z"),
        ] {
            service
                .db_insert_journal_record(journal_params(event_id, created_at))
                .await
                .unwrap();
        }

        // A writer with uncommitted rows is invisible to both statements
        let writer = service.connect_with_timeout().await.unwrap();
        let pending = writer
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .unwrap();
        pending
            .execute(
                "INSERT INTO journal (event_id, created_at) VALUES (4, '2026-01-01T00:00:04.000000Z')",
                (),
            )
            .await
            .unwrap();

        let (count, records) = service
            .db_get_journal_page("", Vec::new(), 0, 10)
            .await
            .unwrap();
        assert_eq!(count, 3);
        let event_ids: Vec<i64> = records.iter().map(|r| r.event_id).collect();
        assert_eq!(event_ids, vec![3, 2, 1]);

        pending.rollback().await.unwrap();

        let (count, records) = service
            .db_get_journal_page("", Vec::new(), 1, 1)
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_id, 2);
    }
}
