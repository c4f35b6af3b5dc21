//! TreeNodes HTTP Server
//!
//! Exposes the `treenodes-core` hierarchy service and failure journal as a
//! JSON API built on axum.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven runtime configuration
//! - [`http`] - Router, endpoints, error responses and failure journaling

pub mod config;
pub mod http;

pub use config::{ConfigError, ServerConfig};
pub use http::{create_router, start_server, AppState};
