//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `TreeService` - Tree and node hierarchy operations
//! - `materialize` - Flat node list to nested tree assembly
//! - `JournalService` - Failure journal writes and reads
//!
//! Services coordinate between the database layer and the request boundary,
//! implementing business rules and translating storage failures into typed
//! errors.

pub mod error;
pub mod journal_service;
pub mod materialize;
pub mod tree_service;

pub use error::TreeServiceError;
pub use journal_service::{
    EventIdGenerator, JournalService, JournalSink, MonotonicEventIds, RandomEventIds,
    MAX_JOURNAL_PAGE,
};
pub use materialize::materialize;
pub use tree_service::{TreeService, TreeServiceConfig};
