//! HTTP boundary for the TreeNodes service
//!
//! # Architecture
//!
//! The server is organized into modular endpoint modules:
//! - `tree_endpoints`: Health check plus tree and node operations
//! - `journal_endpoints`: Failure journal reads
//!
//! Every route sits behind the failure-journal middleware, so any handler
//! error is recorded before its response leaves the server.

use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use treenodes_core::services::{JournalService, JournalSink, TreeService};

mod api_error;
mod failure_journal;
mod journal_endpoints;
mod tree_endpoints;

pub use api_error::{ApiError, CapturedFailure, ErrorBody, ErrorData, EXCEPTION_TYPE, SECURE_TYPE};
pub use journal_endpoints::DEFAULT_JOURNAL_TAKE;
pub use tree_endpoints::{CreatedNode, HealthStatus};

use crate::config::DEFAULT_MAX_BODY_BYTES;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub tree_service: Arc<TreeService>,
    /// Journal reads
    pub journal: Arc<JournalService>,
    /// Where the middleware records failures; the journal service by default
    pub journal_sink: Arc<dyn JournalSink>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(tree_service: Arc<TreeService>, journal: Arc<JournalService>) -> Self {
        Self {
            tree_service,
            journal_sink: journal.clone(),
            journal,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_journal_sink(mut self, sink: Arc<dyn JournalSink>) -> Self {
        self.journal_sink = sink;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Create the main application router with all endpoint modules
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(tree_endpoints::routes(state.clone()))
        .merge(journal_endpoints::routes(state.clone()))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            state,
            failure_journal::journal_failures,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server and run until Ctrl+C
///
/// # Errors
///
/// Returns error if server fails to bind or start.
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);

    tracing::info!("🚀 HTTP server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
