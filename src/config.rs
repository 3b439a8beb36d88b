use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::ConfigError;

/// Runtime settings: TOML file first, then `RAYOS_*` environment overrides.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub origin: String,
    pub user_agent: String,
    pub handshake: String,
    pub database_path: PathBuf,
    pub max_events: usize,
    pub log_dir: PathBuf,
    pub metrics_addr: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_ENDPOINT.to_string(),
            origin: constants::DEFAULT_ORIGIN.to_string(),
            user_agent: constants::DEFAULT_USER_AGENT.to_string(),
            handshake: constants::DEFAULT_HANDSHAKE.to_string(),
            database_path: PathBuf::from(constants::DEFAULT_DATABASE_PATH),
            max_events: constants::DEFAULT_SUCCESS_THRESHOLD,
            log_dir: PathBuf::from(constants::DEFAULT_LOG_DIR),
            metrics_addr: None,
        }
    }
}

impl Settings {
    /// Load settings from `path` (a missing file means defaults) and apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from `RAYOS_*` variables; `get` abstracts the environment.
    pub fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("RAYOS_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = get("RAYOS_DB_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("RAYOS_MAX_EVENTS") {
            self.max_events = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "RAYOS_MAX_EVENTS",
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("RAYOS_LOG_DIR") {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = get("RAYOS_METRICS_ADDR") {
            self.metrics_addr = Some(v).filter(|s| !s.trim().is_empty());
        }
        Ok(())
    }
}
