//! Runtime server configuration
//!
//! ServerConfig is the single source of truth for what the running process
//! uses. It is read from the environment once at startup and is immutable for
//! the lifetime of the server.
//!
//! # Environment Variables
//!
//! - `TREENODES_DB_PATH`: Database file (default: `~/.treenodes/database/treenodes.db`)
//! - `TREENODES_HOST`: Bind address (default: `127.0.0.1`)
//! - `TREENODES_PORT`: Bind port (default: `3001`)
//! - `TREENODES_CREATE_TREE_ON_FETCH`: `true`/`false`/`1`/`0` (default: `false`)
//! - `TREENODES_MAX_BODY_BYTES`: Request body limit in bytes (default: 1 MiB)
//! - `RUST_LOG`: Logging filter (default: `info`)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;
use treenodes_core::services::TreeServiceConfig;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration errors, reported before any service starts
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to get home directory; set TREENODES_DB_PATH")]
    HomeDirUnavailable,
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Resolved server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Path to the libsql database file
    pub db_path: PathBuf,

    pub host: IpAddr,

    pub port: u16,

    /// Whether `GET /api/trees/:treeName` creates missing trees
    pub create_tree_on_fetch: bool,

    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// if it is set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = match lookup("TREENODES_DB_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_database_path()?,
        };

        let host = match lookup("TREENODES_HOST") {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::invalid("TREENODES_HOST", &raw, e.to_string()))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let port = match lookup("TREENODES_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("TREENODES_PORT", &raw, e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let create_tree_on_fetch = match lookup("TREENODES_CREATE_TREE_ON_FETCH") {
            Some(raw) => parse_flag("TREENODES_CREATE_TREE_ON_FETCH", &raw)?,
            None => false,
        };

        let max_body_bytes = match lookup("TREENODES_MAX_BODY_BYTES") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        "TREENODES_MAX_BODY_BYTES",
                        &raw,
                        "must be greater than 0",
                    ))
                }
                Ok(bytes) => bytes,
                Err(e) => {
                    return Err(ConfigError::invalid(
                        "TREENODES_MAX_BODY_BYTES",
                        &raw,
                        e.to_string(),
                    ))
                }
            },
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            db_path,
            host,
            port,
            create_tree_on_fetch,
            max_body_bytes,
        })
    }

    /// Address the server binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Settings handed to the hierarchy service
    pub fn tree_service_config(&self) -> TreeServiceConfig {
        TreeServiceConfig {
            create_tree_on_fetch: self.create_tree_on_fetch,
        }
    }
}

/// Unified default path across platforms: `~/.treenodes/database/treenodes.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;

    Ok(home_dir
        .join(".treenodes")
        .join("database")
        .join("treenodes.db"))
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::invalid(var, raw, "expected true, false, 1 or 0")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("TREENODES_DB_PATH", "/tmp/t.db")]).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3001");
        assert!(!config.create_tree_on_fetch);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TREENODES_DB_PATH", "/data/trees.db"),
            ("TREENODES_HOST", "0.0.0.0"),
            ("TREENODES_PORT", "8080"),
            ("TREENODES_CREATE_TREE_ON_FETCH", "TRUE"),
            ("TREENODES_MAX_BODY_BYTES", "2048"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert!(config.tree_service_config().create_tree_on_fetch);
        assert_eq!(config.max_body_bytes, 2048);
    }

    #[test]
    fn test_invalid_values_fail_fast() {
        let err = config_from(&[("TREENODES_DB_PATH", "/x"), ("TREENODES_PORT", "http")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "TREENODES_PORT",
                ..
            }
        ));

        let err = config_from(&[
            ("TREENODES_DB_PATH", "/x"),
            ("TREENODES_CREATE_TREE_ON_FETCH", "yes"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("TREENODES_CREATE_TREE_ON_FETCH"));

        assert!(config_from(&[
            ("TREENODES_DB_PATH", "/x"),
            ("TREENODES_MAX_BODY_BYTES", "0")
        ])
        .is_err());
    }
}
