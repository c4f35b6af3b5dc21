//! TreeNodes HTTP Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (127.0.0.1:3001, default DB path)
//! cargo run --bin treenodes-server
//!
//! # Custom port and database
//! TREENODES_PORT=3002 TREENODES_DB_PATH=/tmp/trees.db cargo run --bin treenodes-server
//! ```
//!
//! See [`treenodes_server::config`] for every environment variable.
//!
//! # Architecture
//!
//! The server initializes:
//! 1. DatabaseService - libsql database and schema
//! 2. TursoStore + TreeService - hierarchy operations
//! 3. JournalService - failure journal (monotonic event ids)

use std::sync::Arc;

use treenodes_core::db::{DatabaseService, TreeStore, TursoStore};
use treenodes_core::services::{JournalService, TreeService};
use treenodes_server::{start_server, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🌳 TreeNodes Server");
    tracing::info!("==================================");

    let config = ServerConfig::from_env()?;

    tracing::info!("📡 Address: {}", config.socket_addr());
    tracing::info!("📦 Database: {}", config.db_path.display());
    tracing::info!(
        "🔧 Create tree on fetch: {}, max body: {} bytes",
        config.create_tree_on_fetch,
        config.max_body_bytes
    );

    tracing::info!("🔧 Initializing services...");

    let db = Arc::new(DatabaseService::new(config.db_path.clone()).await?);
    let store: Arc<dyn TreeStore> = Arc::new(TursoStore::new(db.clone()));
    let tree_service = Arc::new(TreeService::with_config(
        store,
        config.tree_service_config(),
    ));
    let journal = Arc::new(JournalService::new(db));

    tracing::info!("✅ Services initialized");

    let state =
        AppState::new(tree_service, journal).with_max_body_bytes(config.max_body_bytes);
    start_server(state, config.socket_addr()).await?;

    Ok(())
}
