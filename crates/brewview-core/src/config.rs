//! Local application configuration.
//!
//! This module handles loading and saving the client configuration, which
//! includes the backend URL, last used username, selected theme and the
//! event socket reconnect interval.
//!
//! Configuration is stored at `~/.config/brewview/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::reconnect::DEFAULT_RECONNECT_SECS;
use crate::events::ReconnectPolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "brewview";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "BREWVIEW_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:2337";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub last_username: Option<String>,
    pub current_theme: Option<String>,
    pub reconnect_interval_secs: u64,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            last_username: None,
            current_theme: None,
            reconnect_interval_secs: DEFAULT_RECONNECT_SECS,
            path: None,
        }
    }
}

impl Config {
    /// Load from the user config directory, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Self::config_path()?)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            debug!(url = %url, "Using API URL from environment");
            config.api_base_url = url;
        }
        Ok(config)
    }

    /// Load from an explicit file; defaults if it does not exist.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.path = Some(path);
        Ok(config)
    }

    /// Config that is never written to disk.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Keep the loaded values but stop writing them back.
    pub fn detached(mut self) -> Self {
        self.path = None;
        self
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Per-server cache directory, keyed by the backend host.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(self.host_key()))
    }

    fn host_key(&self) -> String {
        let without_scheme = self
            .api_base_url
            .split("://")
            .last()
            .unwrap_or(&self.api_base_url);
        without_scheme
            .trim_end_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect()
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::Fixed(Duration::from_secs(self.reconnect_interval_secs.max(1)))
    }
}
