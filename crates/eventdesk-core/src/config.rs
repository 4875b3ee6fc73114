//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! backend location, demo mode, the last event worked on, and cache tuning.
//!
//! Configuration is stored at `~/.config/eventdesk/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::services::AppMode;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "eventdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_BACKEND_URL: &str = "EVENTDESK_BACKEND_URL";
const ENV_ANON_KEY: &str = "EVENTDESK_ANON_KEY";
const ENV_ACCESS_TOKEN: &str = "EVENTDESK_ACCESS_TOKEN";
const ENV_DEMO: &str = "EVENTDESK_DEMO";

/// Freshness windows and memory bound for the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub memory_capacity: usize,
    pub dashboard_ttl_secs: i64,
    pub registrations_ttl_secs: i64,
    pub visitors_ttl_secs: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memory_capacity: 256,
            dashboard_ttl_secs: 5 * 60,
            registrations_ttl_secs: 30 * 60,
            visitors_ttl_secs: 5 * 60,
        }
    }
}

impl CacheSettings {
    pub fn dashboard_ttl(&self) -> Duration {
        Duration::seconds(self.dashboard_ttl_secs.max(0))
    }

    pub fn registrations_ttl(&self) -> Duration {
        Duration::seconds(self.registrations_ttl_secs.max(0))
    }

    pub fn visitors_ttl(&self) -> Duration {
        Duration::seconds(self.visitors_ttl_secs.max(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub anon_key: Option<String>,
    /// Never persisted; comes from the environment.
    #[serde(skip)]
    pub access_token: Option<String>,
    pub demo_mode: bool,
    pub last_event_id: Option<i64>,
    pub cache: CacheSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Overlay values from `EVENTDESK_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }
        if let Some(key) = var(ENV_ANON_KEY) {
            self.anon_key = Some(key);
        }
        if let Some(token) = var(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token);
        }
        if let Some(demo) = var(ENV_DEMO) {
            self.demo_mode = matches!(demo.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    pub fn mode(&self) -> AppMode {
        if self.demo_mode {
            AppMode::Demo
        } else {
            AppMode::Live
        }
    }
}
