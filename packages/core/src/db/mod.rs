//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Schema with storage-level uniqueness and same-tree parent constraints
//! - Transaction-scoped repository for trees and nodes
//! - Append-only failure journal
//!
//! # Architecture
//!
//! Services talk to storage through the [`TreeStore`] trait. [`TursoStore`] is
//! the libsql implementation; every unit of work gets its own connection and
//! transaction so concurrent requests never share connection state.

mod database;
mod error;
mod tree_store;
mod turso_store;

pub use database::{DatabaseService, DbInsertJournalParams, BUSY_TIMEOUT_MS};
pub use error::DatabaseError;
pub use tree_store::{TreeStore, TreeTransaction};
pub use turso_store::{TursoStore, TursoTransaction};
