use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "http://memegenerator.net";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const SERVICE_URL_ENV_VAR: &str = "MEME_SERVICE_URL";
const CONFIG_DIR_NAME: &str = ".meme";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    ConfigDirUnavailable,
    #[error("failed to read or write configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize configuration: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service_url: String,
    /// Per-request timeout in seconds; `0` disables it.
    pub timeout_secs: u64,
    pub clipboard: bool,
    pub image_output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            clipboard: true,
            image_output_dir: default_image_output_dir(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Applies `MEME_SERVICE_URL` on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env_overrides();
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(SERVICE_URL_ENV_VAR) {
            let url = url.trim();
            if !url.is_empty() {
                tracing::debug!(service_url = url, "service URL overridden from environment");
                self.service_url = url.to_string();
            }
        }
    }
}

/// Loads the meme configuration from disk, creating a default file if absent.
///
/// Files written by older versions are rewritten with any missing
/// `image_output_dir` filled in. `MEME_SERVICE_URL` overrides the stored
/// service URL without being persisted.
pub fn load_or_init() -> Result<LoadOutcome, ConfigError> {
    let path = config_file_path()?;

    let (mut config, created) = if path.exists() {
        let contents = fs::read_to_string(&path)?;
        let raw: toml::Table = toml::from_str(&contents)?;
        let mut config: Config = toml::from_str(&contents)?;
        if !raw.contains_key("image_output_dir") || config.image_output_dir.trim().is_empty() {
            config.image_output_dir = config_dir_string(&path);
            save(&config, &path)?;
        }
        (config, false)
    } else {
        ensure_parent_exists(&path)?;
        let mut config = Config::default();
        config.image_output_dir = config_dir_string(&path);
        save(&config, &path)?;
        tracing::debug!(path = %path.display(), "created default configuration");
        (config, true)
    };

    config.apply_env_overrides();

    Ok(LoadOutcome {
        config,
        path,
        created,
    })
}

/// Persist the given configuration to disk at the provided path.
pub fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    ensure_parent_exists(path)?;
    let serialized = toml::to_string_pretty(config)?;
    fs::write(path, serialized)?;
    Ok(())
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub config: Config,
    pub path: PathBuf,
    pub created: bool,
}

fn ensure_parent_exists(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn config_dir_string(path: &Path) -> String {
    path.parent()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn default_image_output_dir() -> String {
    BaseDirs::new()
        .map(|dirs| {
            dirs.home_dir()
                .join(CONFIG_DIR_NAME)
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_default()
}

fn config_file_path() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::ConfigDirUnavailable)?;
    Ok(base_dirs
        .home_dir()
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests;
