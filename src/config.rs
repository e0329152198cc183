//! Configuration Management
//!
//! Engine-wide settings: async-operation polling, HTTP transport and logging.
//! Stored as JSON; every field has a default so partial files are fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub poll: PollConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// Async-operation polling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    /// Wait before the second poll; doubles every round
    pub initial_interval_secs: u64,
    /// Upper bound for a single wait
    pub max_interval_secs: u64,
    /// Hard limit for the whole polling loop
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_secs: 2,
            max_interval_secs: 30,
            timeout_secs: 300,
        }
    }
}

impl PollConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_secs(self.initial_interval_secs)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Prefix for relative request paths
    pub base_url: Option<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: format!("restform/{}", crate::VERSION),
            request_timeout_secs: 60,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `restform=debug`
    pub level: String,
    /// Write logs to a file instead of stderr
    pub to_file: bool,
    /// Log file; defaults to `restform.log` in the config directory
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
            file: None,
        }
    }
}

impl EngineConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("restform").join("config.json"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }
}
