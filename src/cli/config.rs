//! Configuration file
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/configstore",
//!   "backend": "file",
//!   "http": { "host": "0.0.0.0", "port": 4002, "cors_origins": [] },
//!   "poll_interval_ms": 1000,
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::storage::{FileStore, MemoryStore, StoreAccessor};

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required for the file backend)
    #[serde(default)]
    pub data_dir: Option<String>,

    #[serde(default)]
    pub backend: Backend,

    #[serde(default)]
    pub http: HttpServerConfig,

    /// Convergence poll interval (default 1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.backend == Backend::File && self.data_dir.as_deref().map_or(true, str::is_empty) {
            return Err(CliError::config_error("data_dir is required for the file backend"));
        }
        if self.poll_interval_ms == 0 {
            return Err(CliError::config_error("poll_interval_ms must be > 0"));
        }
        self.log_severity()?;
        Ok(())
    }

    pub fn log_severity(&self) -> CliResult<Severity> {
        self.log_level.parse().map_err(CliError::config_error)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Data directory as Path; `None` for the memory backend
    pub fn data_path(&self) -> Option<&Path> {
        match self.backend {
            Backend::File => self.data_dir.as_deref().map(Path::new),
            Backend::Memory => None,
        }
    }

    /// Open the configured backend. The file backend must be initialized.
    pub fn open_store(&self) -> CliResult<Arc<dyn StoreAccessor>> {
        match self.data_path() {
            Some(data_dir) => {
                if !is_initialized(data_dir) {
                    return Err(CliError::not_initialized());
                }
                Ok(Arc::new(FileStore::open(data_dir)?))
            }
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }
}

/// Whether `init` has run against this data directory
pub fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join("data").join("store.dat").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json(r#"{"data_dir": "/tmp/cs"}"#).unwrap();
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.http.port, 4002);
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.log_severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_file_backend_requires_data_dir() {
        assert!(Config::from_json("{}").is_err());
        assert!(Config::from_json(r#"{"backend": "memory"}"#).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_json(r#"{"data_dir": "d", "poll_interval_ms": 0}"#).is_err());
        assert!(Config::from_json(r#"{"data_dir": "d", "log_level": "loud"}"#).is_err());
        assert!(Config::from_json(r#"{"data_dir": "d", "backend": "s3"}"#).is_err());
    }

    #[test]
    fn test_uninitialized_dir_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: Some(dir.path().display().to_string()),
            backend: Backend::File,
            http: HttpServerConfig::default(),
            poll_interval_ms: 1000,
            log_level: "info".to_string(),
        };
        let err = config.open_store().err().unwrap();
        assert_eq!(err.code_str(), "CS_CLI_NOT_INITIALIZED");
    }
}
