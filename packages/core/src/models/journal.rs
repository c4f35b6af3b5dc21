//! Journal Data Structures
//!
//! The journal is an append-only log of failures captured at the API
//! boundary. Each record gets a generated `event_id` that is returned to the
//! caller so a failure can be traced without exposing internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure details handed to a journal sink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub request_path: String,
    pub http_method: String,
    pub query_string: String,
    pub body: String,
    pub exception_type: String,
    pub message: String,
    pub stack_trace: String,
}

/// A persisted journal row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRecord {
    pub id: i64,
    pub event_id: i64,
    pub created_at: DateTime<Utc>,
    pub request_path: String,
    pub http_method: String,
    pub query_string: String,
    pub body: String,
    pub exception_type: String,
    pub message: String,
    pub stack_trace: String,
}

/// Optional filter for journal range queries
///
/// `from`/`to` are inclusive bounds on `created_at`. `search` matches a
/// substring of the message, exception type or request path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

/// Summary of one journal record in a range page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalInfo {
    pub id: i64,
    pub event_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A page of journal records, newest first
///
/// `count` is the total number of records matching the filter, not the
/// number of items in this page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRange {
    pub skip: u32,
    pub count: u64,
    pub items: Vec<JournalInfo>,
}

/// Single journal record as shown to API callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: i64,
    pub event_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<JournalRecord> for JournalEntry {
    fn from(record: JournalRecord) -> Self {
        Self {
            id: record.id,
            event_id: record.event_id,
            text: record.message,
            created_at: record.created_at,
        }
    }
}
