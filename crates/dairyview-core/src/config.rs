//! Application configuration management.
//!
//! Configuration is stored at `~/.config/dairyview/config.json`. Environment
//! variables (optionally loaded from `.env`) override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::source::demo::DEFAULT_DEMO_LATENCY_MS;

/// Application name used for config/cache/data directory paths
const APP_NAME: &str = "dairyview";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

pub const ENV_API_URL: &str = "DAIRYVIEW_API_URL";
pub const ENV_DEMO: &str = "DAIRYVIEW_DEMO";
pub const ENV_USERNAME: &str = "DAIRYVIEW_USERNAME";
pub const ENV_PASSWORD: &str = "DAIRYVIEW_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub demo_mode: bool,
    pub last_username: Option<String>,
    pub request_timeout_secs: u64,
    pub dashboard_poll_secs: u64,
    pub routes_poll_secs: u64,
    pub tanks_poll_secs: u64,
    pub demo_latency_ms: u64,

    /// Login form prefill from the environment; never written to disk.
    #[serde(skip)]
    pub prefill_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            demo_mode: false,
            last_username: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            dashboard_poll_secs: 30,
            routes_poll_secs: 30,
            tanks_poll_secs: 120,
            demo_latency_ms: DEFAULT_DEMO_LATENCY_MS,
            prefill_password: None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load the config file and apply environment overrides. A missing or
    /// unreadable file yields the defaults.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&contents).unwrap_or_else(|e| {
                    warn!(error = %e, path = %path.display(), "Invalid config, using defaults");
                    Self::default()
                })
            }
            Ok(_) => Self::default(),
            Err(e) => {
                warn!(error = %e, "No config directory, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
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

    /// Apply `DAIRYVIEW_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_DEMO) {
            match parse_flag(&raw) {
                Some(flag) => self.demo_mode = flag,
                None => warn!(value = %raw, "Ignoring unrecognised {}", ENV_DEMO),
            }
        }
        if let Some(username) = lookup(ENV_USERNAME).filter(|v| !v.is_empty()) {
            self.last_username = Some(username);
        }
        if let Some(password) = lookup(ENV_PASSWORD).filter(|v| !v.is_empty()) {
            self.prefill_password = Some(password);
        }
    }

    pub fn dashboard_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_poll_secs.max(1))
    }

    pub fn routes_interval(&self) -> Duration {
        Duration::from_secs(self.routes_poll_secs.max(1))
    }

    pub fn tanks_interval(&self) -> Duration {
        Duration::from_secs(self.tanks_poll_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Log file location
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Durable session storage location
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
