//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the document-store project id and API key. Values from the environment
//! (`REGISTRO_PROJECT_ID`, `REGISTRO_API_KEY`, usually via a `.env` file)
//! override the config file.
//!
//! Configuration is stored at `~/.config/registro/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "registro";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
}

impl Config {
    /// Config file contents only, no environment overrides.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// File config with environment overrides applied.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;

        if let Ok(project_id) = std::env::var("REGISTRO_PROJECT_ID") {
            config.project_id = Some(project_id);
        }
        if let Ok(api_key) = std::env::var("REGISTRO_API_KEY") {
            config.api_key = Some(api_key);
        }

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

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Cache directory, namespaced by project so switching projects never
    /// serves another project's snapshots.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(ref project_id) = self.project_id {
            path = path.join(project_id);
        }
        Ok(path)
    }
}
