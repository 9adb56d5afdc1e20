use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log;
use serde::{Deserialize, Serialize};
use toml;

use crate::common::{expand_tilde, home_dir};

/// Runner configuration, read from `~/.config/srunner/srunner.toml`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Actions document, either a path or a bare file name searched for
    /// next to the working directory and the executable.
    pub catalog: String,
    /// Subdirectory searched for the actions document.
    pub resource_dir: String,
    /// Terminal emulator for `shell` actions (Linux/BSD).
    pub terminal: String,
    /// Elevation helper for `elevated` actions (Linux/BSD).
    pub elevation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: String::from("actions.json"),
            resource_dir: String::from("resources"),
            terminal: String::from("xterm"),
            elevation: String::from("pkexec"),
            database: None,
        }
    }
}

impl Config {
    /// Loads the user's config, falling back to defaults if it is unusable.
    pub fn init() -> Self {
        Self::load().unwrap_or_else(|e| {
            log::error!("Failed to load config: {}", e);
            Config::default()
        })
    }

    pub fn catalog_path(&self) -> PathBuf {
        expand_tilde(&self.catalog)
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.as_deref().map(expand_tilde)
    }

    /// Load configuration from disk, creating a default if none exists
    fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config = if !config_path.exists() {
            log::info!(
                "No config file found at {:?}, creating default config",
                config_path
            );
            Config::default()
        } else {
            log::info!("Loading config from {:?}", config_path);
            let config_str = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file at {:?}", config_path))?;

            match toml::from_str(&config_str) {
                Ok(config) => {
                    log::info!("Successfully loaded config file");
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                    // Backup invalid config file
                    let backup_path = config_path.with_extension("toml.bak");
                    if let Err(e) = fs::rename(config_path, &backup_path) {
                        log::error!("Failed to backup invalid config: {}", e);
                    } else {
                        log::info!("Backed up invalid config to {:?}", backup_path);
                    }
                    Config::default()
                }
            }
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory at {:?}", parent))?;
        }

        // Write config (ensures a valid config always exists)
        fs::write(config_path, toml::to_string_pretty(&config)?)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        log::info!("Wrote config to {:?}", config_path);

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        Ok(home_dir()?.join(".config/srunner/srunner.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/srunner.toml");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config, Config::default());
        let written: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("srunner.toml");
        fs::write(&path, "terminal = \"alacritty\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.terminal, "alacritty");
        assert_eq!(config.catalog, "actions.json");
        assert_eq!(config.elevation, "pkexec");
    }

    #[test]
    fn test_invalid_config_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("srunner.toml");
        fs::write(&path, "terminal = [").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(dir.path().join("srunner.toml.bak").exists());
        assert!(path.exists());
    }
}
