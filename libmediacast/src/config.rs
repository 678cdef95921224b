//! Configuration management for Mediacast

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token.
    pub token: String,
    /// Broadcast destination: a numeric chat id or an @channel handle.
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// External chat ids allowed to use administrator commands.
    pub chat_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Caption stamped on every queued submission.
    pub caption: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            caption: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let mut config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// The admin allow-list, resolved once into an immutable set.
    pub fn admin_set(&self) -> AdminSet {
        AdminSet::new(self.admin.chat_ids.iter().copied())
    }

    /// Transport credentials may come from the environment instead of
    /// the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("MEDIACAST_BOT_TOKEN") {
            self.telegram.token = token;
        }
        if let Ok(channel) = std::env::var("MEDIACAST_CHANNEL_ID") {
            self.telegram.channel_id = channel;
        }
    }
}

/// Static admin allow-list, injected at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AdminSet(HashSet<i64>);

impl AdminSet {
    pub fn new(chat_ids: impl IntoIterator<Item = i64>) -> Self {
        Self(chat_ids.into_iter().collect())
    }

    pub fn contains(&self, chat_id: i64) -> bool {
        self.0.contains(&chat_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MEDIACAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("mediacast").join("config.toml"))
}
