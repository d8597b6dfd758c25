use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{ServerConfig, System};

/// Consider cache stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

const SYSTEMS_CACHE: &str = "systems";
const SERVER_CONFIG_CACHE: &str = "config";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let path = self.cache_path(name);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        debug!(cache = name, "Saved cache");
        Ok(())
    }

    // ===== Systems =====

    pub fn load_systems(&self) -> Result<Option<CachedData<Vec<System>>>> {
        self.load(SYSTEMS_CACHE)
    }

    pub fn save_systems(&self, systems: &[System]) -> Result<()> {
        self.save(SYSTEMS_CACHE, &systems)
    }

    // ===== Server config =====

    pub fn load_server_config(&self) -> Result<Option<CachedData<ServerConfig>>> {
        self.load(SERVER_CONFIG_CACHE)
    }

    pub fn save_server_config(&self, config: &ServerConfig) -> Result<()> {
        self.save(SERVER_CONFIG_CACHE, config)
    }

    /// Remove every cached file
    pub fn clear(&self) -> Result<()> {
        for name in [SYSTEMS_CACHE, SERVER_CONFIG_CACHE] {
            let path = self.cache_path(name);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove cache file: {}", name))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
