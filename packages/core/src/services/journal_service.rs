//! Failure Journal
//!
//! [`JournalSink`] is the contract the request boundary uses to record a
//! failure and get back the event id it reports to the caller.
//! [`JournalService`] is the libsql-backed implementation, which also serves
//! paged and single-record reads of the journal.
//!
//! Event ids come from an injected [`EventIdGenerator`] so uniqueness never
//! depends on wall-clock resolution.

use crate::db::{DatabaseError, DatabaseService, DbInsertJournalParams};
use crate::models::{FailureReport, JournalEntry, JournalFilter, JournalInfo, JournalRange};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Largest page `get_range` will return
pub const MAX_JOURNAL_PAGE: u32 = 500;

/// Attempts made when a generated event id collides with a stored one
const EVENT_ID_ATTEMPTS: usize = 3;

/// Receives structured failure records
#[async_trait]
pub trait JournalSink: Send + Sync {
    /// Persist `report` and return its generated event id
    async fn record_failure(&self, report: FailureReport) -> Result<i64, DatabaseError>;
}

/// Source of journal event ids
pub trait EventIdGenerator: Send + Sync {
    fn next_id(&self) -> i64;
}

/// Strictly increasing event ids seeded from the clock
///
/// Each id is the current UTC time in microseconds, or the previous id plus
/// one if the clock has not advanced (or went backwards). Ids therefore stay
/// informative about when the failure happened without ever repeating
/// within a process.
#[derive(Debug, Default)]
pub struct MonotonicEventIds {
    last: AtomicI64,
}

impl MonotonicEventIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventIdGenerator for MonotonicEventIds {
    fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// Random positive 63-bit event ids derived from v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomEventIds;

impl EventIdGenerator for RandomEventIds {
    fn next_id(&self) -> i64 {
        // 128 - 65 = 63 bits, always fits a non-negative i64
        ((Uuid::new_v4().as_u128() >> 65) as i64).max(1)
    }
}

/// Journal storage and queries
#[derive(Clone)]
pub struct JournalService {
    db: Arc<DatabaseService>,
    ids: Arc<dyn EventIdGenerator>,
}

impl JournalService {
    /// Create a journal service using [`MonotonicEventIds`]
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self::with_generator(db, Arc::new(MonotonicEventIds::new()))
    }

    pub fn with_generator(db: Arc<DatabaseService>, ids: Arc<dyn EventIdGenerator>) -> Self {
        Self { db, ids }
    }

    /// Page through journal records, newest first
    ///
    /// `take` is capped at [`MAX_JOURNAL_PAGE`]. The returned `count` is the
    /// number of records matching `filter`, independent of paging, read from
    /// the same snapshot as `items`.
    pub async fn get_range(
        &self,
        skip: u32,
        take: u32,
        filter: &JournalFilter,
    ) -> Result<JournalRange, DatabaseError> {
        let take = take.min(MAX_JOURNAL_PAGE);
        let (where_clause, params) = build_filter(filter);

        let (count, records) = self
            .db
            .db_get_journal_page(&where_clause, params, skip, take)
            .await?;

        Ok(JournalRange {
            skip,
            count,
            items: records
                .into_iter()
                .map(|record| JournalInfo {
                    id: record.id,
                    event_id: record.event_id,
                    created_at: record.created_at,
                })
                .collect(),
        })
    }

    /// Look up one journal record by event id
    pub async fn get_single(&self, event_id: i64) -> Result<Option<JournalEntry>, DatabaseError> {
        Ok(self
            .db
            .db_get_journal_by_event_id(event_id)
            .await?
            .map(JournalEntry::from))
    }
}

#[async_trait]
impl JournalSink for JournalService {
    async fn record_failure(&self, report: FailureReport) -> Result<i64, DatabaseError> {
        let created_at = format_timestamp(Utc::now());

        let mut attempt = 1;
        loop {
            let event_id = self.ids.next_id();
            let result = self
                .db
                .db_insert_journal_record(DbInsertJournalParams {
                    event_id,
                    created_at: &created_at,
                    request_path: &report.request_path,
                    http_method: &report.http_method,
                    query_string: &report.query_string,
                    body: &report.body,
                    exception_type: &report.exception_type,
                    message: &report.message,
                    stack_trace: &report.stack_trace,
                })
                .await;

            match result {
                Ok(_) => return Ok(event_id),
                Err(e) if e.is_unique_violation() && attempt < EVENT_ID_ATTEMPTS => {
                    tracing::warn!("Journal event id {} already used, retrying", event_id);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// order matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Build the WHERE clause and its parameters for a journal filter
fn build_filter(filter: &JournalFilter) -> (String, Vec<libsql::Value>) {
    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<libsql::Value> = Vec::new();

    if let Some(from) = filter.from {
        conditions.push("created_at >= ?");
        params.push(libsql::Value::Text(format_timestamp(from)));
    }
    if let Some(to) = filter.to {
        conditions.push("created_at <= ?");
        params.push(libsql::Value::Text(format_timestamp(to)));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            conditions.push(
                "(message LIKE ? ESCAPE '\\' OR exception_type LIKE ? ESCAPE '\\' OR request_path LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(search));
            for _ in 0..3 {
                params.push(libsql::Value::Text(pattern.clone()));
            }
        }
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), params)
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn create_test_journal() -> (JournalService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
        (JournalService::new(db), temp_dir)
    }

    fn report(path: &str, kind: &str, message: &str) -> FailureReport {
        FailureReport {
            request_path: path.to_string(),
            http_method: "POST".to_string(),
            exception_type: kind.to_string(),
            message: message.to_string(),
            ..Default::default()
        }
    }

    /// Always hands out the same id
    struct FixedEventIds(i64);

    impl EventIdGenerator for FixedEventIds {
        fn next_id(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn test_monotonic_ids_strictly_increase() {
        let ids = MonotonicEventIds::new();
        let mut previous = ids.next_id();
        for _ in 0..10_000 {
            let next = ids.next_id();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_monotonic_ids_are_unique_across_threads() {
        let ids = Arc::new(MonotonicEventIds::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..1_000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate event id {}", id);
            }
        }
        assert_eq!(seen.len(), 4_000);
    }

    #[test]
    fn test_random_ids_are_positive() {
        let ids = RandomEventIds;
        for _ in 0..1_000 {
            assert!(ids.next_id() > 0);
        }
    }

    #[test]
    fn test_escape_like_escapes_wildcards() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[tokio::test]
    async fn test_record_and_get_single() {
        let (journal, _temp) = create_test_journal().await;

        let event_id = journal
            .record_failure(report("/api/nodes/1", "NotFoundError", "Node missing"))
            .await
            .unwrap();

        let entry = journal.get_single(event_id).await.unwrap().unwrap();
        assert_eq!(entry.event_id, event_id);
        assert_eq!(entry.text, "Node missing");

        assert!(journal.get_single(event_id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_range_is_newest_first_with_total_count() {
        let (journal, _temp) = create_test_journal().await;

        let mut event_ids = Vec::new();
        for i in 0..5 {
            event_ids.push(
                journal
                    .record_failure(report("/api/trees/T1", "StorageError", &format!("m{}", i)))
                    .await
                    .unwrap(),
            );
        }

        let page = journal
            .get_range(1, 2, &JournalFilter::default())
            .await
            .unwrap();
        assert_eq!(page.skip, 1);
        assert_eq!(page.count, 5);
        let returned: Vec<i64> = page.items.iter().map(|i| i.event_id).collect();
        assert_eq!(returned, vec![event_ids[3], event_ids[2]]);
    }

    #[tokio::test]
    async fn test_range_search_matches_message_kind_or_path() {
        let (journal, _temp) = create_test_journal().await;

        journal
            .record_failure(report("/api/nodes/1", "NameConflictError", "duplicate"))
            .await
            .unwrap();
        journal
            .record_failure(report("/api/trees/Forest", "NotFoundError", "missing"))
            .await
            .unwrap();
        journal
            .record_failure(report("/api/nodes/2", "HasChildrenError", "50% done"))
            .await
            .unwrap();

        let search = |s: &str| JournalFilter {
            search: Some(s.to_string()),
            ..Default::default()
        };

        assert_eq!(journal.get_range(0, 10, &search("Conflict")).await.unwrap().count, 1);
        assert_eq!(journal.get_range(0, 10, &search("Forest")).await.unwrap().count, 1);
        assert_eq!(journal.get_range(0, 10, &search("/api/nodes")).await.unwrap().count, 2);
        assert_eq!(journal.get_range(0, 10, &search("%")).await.unwrap().count, 1);
        assert_eq!(journal.get_range(0, 10, &search("  ")).await.unwrap().count, 3);
    }

    #[tokio::test]
    async fn test_range_time_bounds() {
        let (journal, _temp) = create_test_journal().await;

        let before = Utc::now() - chrono::Duration::seconds(1);
        journal
            .record_failure(report("/a", "StorageError", "x"))
            .await
            .unwrap();
        let after = Utc::now() + chrono::Duration::seconds(1);

        let in_window = JournalFilter {
            from: Some(before),
            to: Some(after),
            ..Default::default()
        };
        assert_eq!(journal.get_range(0, 10, &in_window).await.unwrap().count, 1);

        let future = JournalFilter {
            from: Some(after),
            ..Default::default()
        };
        assert_eq!(journal.get_range(0, 10, &future).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_colliding_event_ids_fail_after_retries() {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            DatabaseService::new(temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let journal = JournalService::with_generator(db, Arc::new(FixedEventIds(42)));

        assert_eq!(
            journal
                .record_failure(report("/a", "StorageError", "first"))
                .await
                .unwrap(),
            42
        );
        let err = journal
            .record_failure(report("/a", "StorageError", "second"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }
}
