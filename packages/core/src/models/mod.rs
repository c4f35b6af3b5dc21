//! Data Models
//!
//! This module contains the core data structures used throughout TreeNodes:
//!
//! - `Tree` - Named grouping that owns a node hierarchy
//! - `Node` - A named entry in a tree, optionally parented by another node
//! - `MaterializedNode` - Nested output representation of a whole tree
//! - Journal records describing captured failures
//!
//! Field and name validation rules shared by every entry point live in
//! [`validation`].

mod journal;
mod node;
mod tree;
pub mod validation;

pub use journal::{
    FailureReport, JournalEntry, JournalFilter, JournalInfo, JournalRange, JournalRecord,
};
pub use node::{DeleteResult, MaterializedNode, NewNode, Node, NodeId};
pub use tree::{Tree, TreeId};
pub use validation::{ValidationError, MAX_NAME_LENGTH};
