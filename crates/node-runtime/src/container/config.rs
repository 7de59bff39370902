//! # Node Configuration
//!
//! Runtime parameters of the node, with sane defaults overridable from the
//! environment.
//!
//! | Field | Env | Default |
//! |-------|-----|---------|
//! | `storage.backend` | `QL_STORAGE_BACKEND` | `memory` |
//! | `storage.data_dir` | `QL_DATA_DIR` | `./data` |
//! | `query.default_page_size` | `QL_PAGE_SIZE` | 20 |
//! | `daemon.poll_interval_ms` | `QL_POLL_INTERVAL_MS` | 5000 |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Query configuration.
    pub query: QueryConfig,
    /// Daemon configuration.
    pub daemon: DaemonConfig,
}

impl NodeConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden from `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup("QL_STORAGE_BACKEND") {
            config.storage.backend = backend.parse()?;
        }
        if let Some(dir) = lookup("QL_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(size) = lookup("QL_PAGE_SIZE") {
            config.query.default_page_size = parse_number("QL_PAGE_SIZE", &size)?;
        }
        if let Some(interval) = lookup("QL_POLL_INTERVAL_MS") {
            config.daemon.poll_interval_ms = parse_number("QL_POLL_INTERVAL_MS", &interval)?;
        }

        info!(
            backend = %config.storage.backend,
            data_dir = ?config.storage.data_dir,
            page_size = config.query.default_page_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.default_page_size == 0 {
            return Err(ConfigError::ZeroValue("query.default_page_size"));
        }
        if self.query.max_page_size < self.query.default_page_size {
            return Err(ConfigError::PageSizeAboveMax {
                default: self.query.default_page_size,
                max: self.query.max_page_size,
            });
        }
        if self.daemon.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("daemon.poll_interval_ms"));
        }
        if self.daemon.batch_size == 0 {
            warn!("daemon.batch_size is 0, queued transactions will never drain");
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown storage backend: {0} (expected memory or rocksdb)")]
    UnknownBackend(String),

    #[error("Invalid number for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("Default page size {default} exceeds the maximum of {max}")]
    PageSizeAboveMax { default: usize, max: usize },

    #[error("Storage backend {0} is not compiled in (enable the `rocksdb` feature)")]
    BackendUnavailable(StorageBackend),
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Ordered in-memory maps, lost on exit.
    #[default]
    Memory,
    /// RocksDB under `storage.data_dir`.
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::RocksDb => f.write_str("rocksdb"),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Backend holding the entity store.
    pub backend: StorageBackend,
    /// Data directory for persistent backends.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Query configuration.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Page size of set queries without an explicit `amount`.
    pub default_page_size: usize,
    /// Upper bound applied to any requested `amount`.
    pub max_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 500,
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Sleep between two iterations, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum transactions submitted per iteration.
    pub batch_size: usize,
}

impl DaemonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            batch_size: 50,
        }
    }
}
