//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, initialization, and query failures.
//!
//! Unique-constraint violations get a dedicated variant because the service
//! layer treats them as the authoritative conflict signal rather than as an
//! opaque storage failure.

use std::path::PathBuf;
use thiserror::Error;

/// Extended SQLite result code for `SQLITE_CONSTRAINT_UNIQUE`
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

/// Primary SQLite result code for `SQLITE_CONSTRAINT`
const SQLITE_CONSTRAINT: i32 = 19;

/// Database operation errors
///
/// Covers all error cases for database connection, initialization,
/// and basic operations. Business rule violations are handled by
/// service-layer error types.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// A UNIQUE constraint rejected an insert or update
    #[error("Unique constraint violated: {context}")]
    UniqueViolation { context: String },

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A row could not be mapped to a model
    #[error("Failed to decode row: {context}")]
    RowDecodeFailed { context: String },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create a row decode error with context
    pub fn row_decode(context: impl Into<String>) -> Self {
        Self::RowDecodeFailed {
            context: context.into(),
        }
    }

    /// Classify a failed write statement
    ///
    /// Unique-constraint failures become [`DatabaseError::UniqueViolation`];
    /// everything else becomes a [`DatabaseError::SqlExecutionError`] carrying
    /// `context` and the driver message.
    pub fn from_write(context: &str, err: libsql::Error) -> Self {
        if is_unique_violation(&err) {
            Self::UniqueViolation {
                context: format!("{}: {}", context, err),
            }
        } else {
            Self::sql_execution(format!("{}: {}", context, err))
        }
    }

    /// Whether this error is a unique-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

/// Detect a UNIQUE constraint failure reported by libsql
///
/// Local connections may report either the extended or the primary result
/// code depending on build flags, so the message is checked as well.
fn is_unique_violation(err: &libsql::Error) -> bool {
    match err {
        libsql::Error::SqliteFailure(code, message) => {
            *code == SQLITE_CONSTRAINT_UNIQUE
                || (*code == SQLITE_CONSTRAINT && message.contains("UNIQUE"))
                || message.contains("UNIQUE constraint failed")
        }
        other => other.to_string().contains("UNIQUE constraint failed"),
    }
}
