// ⚙️ Config - runtime settings from ALLOC_* environment variables

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default log file for the terminal dialog, which owns the screen.
pub const DEFAULT_DIALOG_LOG_FILE: &str = "allocation-dialog.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database path.
    pub db_path: PathBuf,

    /// Listen address for the API server.
    pub bind_addr: String,

    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Where logs go when stderr is not usable.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("allocations.db"),
            bind_addr: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let db_path = lookup("ALLOC_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = lookup("ALLOC_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let log_level = lookup("ALLOC_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_file = lookup("ALLOC_LOG_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            db_path,
            bind_addr,
            log_level,
            log_file,
        })
    }

    /// Parsed listen address. Only the server needs it, so a bad value does
    /// not break the CLI commands.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("ALLOC_BIND_ADDR must be host:port, got {:?}", self.bind_addr))
    }

    /// Log file for the terminal dialog.
    pub fn dialog_log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIALOG_LOG_FILE))
    }
}
