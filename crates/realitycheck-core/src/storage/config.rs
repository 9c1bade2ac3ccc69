//! TOML-based application configuration.
//!
//! Stores:
//! - The signed-in user id used by the CLI
//! - Tracking thresholds (usage dead-band, growth/level intervals, rewards)
//! - The block list consulted when an offline session starts
//! - Backend selection
//!
//! Configuration is stored at `~/.config/realitycheck/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};

/// Who is signed in. `None` makes every session command a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub current_user_id: Option<String>,
}

/// Thresholds and intervals for session tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Usage windows shorter than this are discarded.
    #[serde(default = "default_min_usage_minutes")]
    pub min_usage_minutes: u64,
    #[serde(default = "default_growth_interval_secs")]
    pub growth_interval_secs: u64,
    #[serde(default = "default_level_check_secs")]
    pub level_check_secs: u64,
    #[serde(default = "default_minutes_per_level")]
    pub minutes_per_level: u64,
    /// Touch-grass rewards per completed minute.
    #[serde(default = "default_reward_multiplier")]
    pub reward_multiplier: f64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockedApp {
    pub name: String,
    #[serde(default = "default_true")]
    pub blocked: bool,
}

/// Apps the user wants out of reach during offline sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockListConfig {
    #[serde(default = "default_block_list")]
    pub apps: Vec<BlockedApp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Skip the database and use the in-memory mock dataset.
    #[serde(default)]
    pub force_offline: bool,
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/realitycheck/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub block_list: BlockListConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_min_usage_minutes() -> u64 {
    1
}
fn default_growth_interval_secs() -> u64 {
    30
}
fn default_level_check_secs() -> u64 {
    60
}
fn default_minutes_per_level() -> u64 {
    10
}
fn default_reward_multiplier() -> f64 {
    1.5
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_database_file() -> String {
    "realitycheck.db".into()
}
fn default_block_list() -> Vec<BlockedApp> {
    ["Instagram", "TikTok", "X", "YouTube", "Reddit"]
        .into_iter()
        .map(|name| BlockedApp {
            name: name.to_string(),
            blocked: true,
        })
        .collect()
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_usage_minutes: default_min_usage_minutes(),
            growth_interval_secs: default_growth_interval_secs(),
            level_check_secs: default_level_check_secs(),
            minutes_per_level: default_minutes_per_level(),
            reward_multiplier: default_reward_multiplier(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for BlockListConfig {
    fn default() -> Self {
        Self {
            apps: default_block_list(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            force_offline: false,
            database_file: default_database_file(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`. Defaults are written only when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string()).into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Does not write to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}
