//! Journal Endpoints
//!
//! Read access to the failure journal.
//!
//! # Endpoints
//!
//! - `GET /api/journal?skip=&take=&from=&to=&search=` - Page through records
//! - `GET /api/journal/:event_id` - Fetch one record by event id

use axum::{
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use treenodes_core::models::{JournalEntry, JournalFilter, JournalRange};

use crate::http::{ApiError, AppState};

/// Page size used when `take` is omitted
pub const DEFAULT_JOURNAL_TAKE: u32 = 50;

/// Query parameters for `GET /api/journal`
///
/// `from`/`to` are RFC 3339 timestamps.
#[derive(Debug, Default, Deserialize)]
pub struct JournalQuery {
    #[serde(default)]
    pub skip: Option<u32>,
    #[serde(default)]
    pub take: Option<u32>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Page through journal records, newest first
///
/// # Example
///
/// ```bash
/// curl "http://localhost:3001/api/journal?skip=0&take=20&search=Conflict"
/// ```
async fn get_journal_range(
    State(state): State<AppState>,
    query: Result<Query<JournalQuery>, QueryRejection>,
) -> Result<Json<JournalRange>, ApiError> {
    let Query(query) = query?;

    let filter = JournalFilter {
        from: query.from,
        to: query.to,
        search: query.search,
    };
    let range = state
        .journal
        .get_range(
            query.skip.unwrap_or(0),
            query.take.unwrap_or(DEFAULT_JOURNAL_TAKE),
            &filter,
        )
        .await?;

    Ok(Json(range))
}

/// Fetch one journal record by event id
async fn get_journal_entry(
    State(state): State<AppState>,
    event_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<JournalEntry>, ApiError> {
    let Path(event_id) = event_id?;

    state
        .journal
        .get_single(event_id)
        .await?
        .map(Json)
        .ok_or(ApiError::JournalEntryNotFound { event_id })
}

/// Create journal routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/journal", get(get_journal_range))
        .route("/api/journal/:event_id", get(get_journal_entry))
        .with_state(state)
}
