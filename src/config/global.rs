//! Global configuration for the update client and distribution server.
//!
//! The configuration lives in a single TOML file shared by the `perplan`
//! CLI (client and server roles). The handoff updater never reads it: its
//! whole contract is the command line it was launched with.
//!
//! # Configuration File Location
//!
//! - **Linux**: `~/.config/perplan-media/config.toml`
//! - **macOS**: `~/Library/Application Support/perplan-media/config.toml`
//! - **Windows**: `%APPDATA%\perplan-media\config.toml`
//!
//! The location can be overridden with the `PERPLAN_CONFIG_PATH`
//! environment variable or the global `--config` flag.
//!
//! # File Format
//!
//! ```toml
//! [update]
//! base_url = "http://updates.example.com:1234"
//! comparator = "numeric"
//!
//! [server]
//! bind = "0.0.0.0:1234"
//! public_url = "http://updates.example.com:1234"
//! ```
//!
//! A missing file is not an error; every field has a default.

use crate::config::update::{ServerConfig, UpdateConfig};
use crate::constants::CONFIG_FILE_NAME;
use crate::core::UpdateError;
use crate::utils::platform::{CONFIG_PATH_ENV, get_config_dir};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Global configuration with one section per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Update client settings.
    #[serde(default, skip_serializing_if = "UpdateConfig::is_default")]
    pub update: UpdateConfig,

    /// Distribution server settings.
    #[serde(default, skip_serializing_if = "ServerConfig::is_default")]
    pub server: ServerConfig,
}

impl GlobalConfig {
    /// Load from the default location, or defaults when the file is absent.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from the default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            anyhow::Error::from(UpdateError::Config {
                message: format!("{}: {e}", path.display()),
            })
        })
    }

    /// Save to a specific file, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Default config file path, honouring `PERPLAN_CONFIG_PATH`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
    }
}
