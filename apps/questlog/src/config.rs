//! # Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `questlog.toml` (or the file given with `--config`)
//! 3. `QUESTLOG_*` environment variables
//! 4. Command-line flags (applied by the CLI)
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! database = "questlog.db"
//! backend = "redb"
//!
//! [api]
//! cors_origins = "http://localhost:3000"
//! rate_limit = 100
//! api_key = "change-me"
//! ```

use crate::api::middleware::DEFAULT_RATE_LIMIT;
use questlog_core::QuestlogError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "questlog.toml";

/// Largest config file accepted (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Database path. A redb file, or a snapshot file for the `file` backend.
    pub database: PathBuf,
    /// `redb` or `file`.
    pub backend: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("questlog.db"),
            backend: "redb".to_string(),
        }
    }
}

/// `[api]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Comma-separated origins, `*` for any. Unset means localhost only.
    pub cors_origins: Option<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Bearer key required on every endpoint except `/health`.
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
        }
    }
}

impl ApiConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut api = Self::default();
        api.apply_env(|key| std::env::var(key).ok());
        api
    }

    /// The API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(origins) = var("QUESTLOG_CORS_ORIGINS") {
            self.cors_origins = Some(origins);
        }
        if let Some(raw) = var("QUESTLOG_RATE_LIMIT") {
            match raw.trim().parse() {
                Ok(limit) => self.rate_limit = limit,
                Err(_) => tracing::warn!("Ignoring invalid QUESTLOG_RATE_LIMIT '{}'", raw),
            }
        }
        if let Some(key) = var("QUESTLOG_API_KEY") {
            self.api_key = Some(key);
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist. Without one, `questlog.toml` in the
    /// working directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, QuestlogError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, QuestlogError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            QuestlogError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(QuestlogError::SerializationError(format!(
                "Config file {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            QuestlogError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> Result<Self, QuestlogError> {
        toml::from_str(content)
            .map_err(|e| QuestlogError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Overlay environment variables read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("QUESTLOG_HOST") {
            self.server.host = host;
        }
        if let Some(raw) = var("QUESTLOG_PORT") {
            match raw.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid QUESTLOG_PORT '{}'", raw),
            }
        }
        if let Some(database) = var("QUESTLOG_DATABASE") {
            self.storage.database = PathBuf::from(database);
        }
        if let Some(backend) = var("QUESTLOG_BACKEND") {
            self.storage.backend = backend;
        }
        self.api.apply_env(&var);
    }
}

// =============================================================================
// TESTS
// =============================================================================
