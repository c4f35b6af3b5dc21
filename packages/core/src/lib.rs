//! TreeNodes Core Business Logic Layer
//!
//! This crate provides the data management and hierarchy operations for
//! TreeNodes: named trees of uniquely named nodes, plus an append-only
//! failure journal.
//!
//! # Architecture
//!
//! - **libsql**: Embedded SQLite-compatible storage
//! - **Constraints as source of truth**: Tree-name and sibling-name uniqueness
//!   are enforced by storage; service checks are a fast path
//! - **One transaction per operation**: Writes commit together or not at all
//!
//! # Modules
//!
//! - [`models`] - Data structures (Tree, Node, MaterializedNode, journal records)
//! - [`services`] - Business services (TreeService, JournalService)
//! - [`db`] - Database layer with libsql integration

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use services::*;
