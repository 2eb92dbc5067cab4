// Configuration management for the launchgate CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/launchgate/config.json
// - Linux: ~/.config/launchgate/config.json
// - Windows: %APPDATA%\launchgate\config.json

use anyhow::{Context, Result};
use launchgate_core::store::SledStorage;
use launchgate_core::{DeviceProfile, LaunchSettings, ModeStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoints, identifiers and timing policy
    pub settings: LaunchSettings,

    /// Bundle identifier reported to the config endpoint
    pub bundle_id: String,

    /// Locale override; detected from the environment when unset
    pub locale: Option<String>,

    /// Attribution id reported by the scripted provider
    pub attribution_id: Option<String>,

    /// Push token and project id to report, if any
    pub push_token: Option<String>,
    pub project_id: Option<String>,

    /// Storage path for launch state
    pub storage_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: LaunchSettings::default(),
            bundle_id: "com.pluhyk.bloomora".to_string(),
            locale: None,
            attribution_id: None,
            push_token: None,
            project_id: None,
            storage_path: None,
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("launchgate");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join("launchgate");

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from file, or create default if not exists
    pub fn load() -> Result<Self> {
        let config_file = Self::config_file()?;

        if config_file.exists() {
            let contents =
                std::fs::read_to_string(&config_file).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_file = Self::config_file()?;
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_file, contents).context("Failed to write config file")?;
        Ok(())
    }

    pub fn storage_dir(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join("state")),
        }
    }

    /// Open the durable mode store
    pub fn open_store(&self) -> Result<ModeStore> {
        let dir = self.storage_dir()?;
        let path = dir.to_str().context("Storage path is not valid UTF-8")?;
        let backend = SledStorage::new(path)
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("Failed to open launch state at {}", dir.display()))?;
        Ok(ModeStore::new(Arc::new(backend)))
    }

    pub fn device_profile(&self) -> DeviceProfile {
        let profile = DeviceProfile::new(self.bundle_id.clone(), &self.settings);
        match &self.locale {
            Some(locale) => profile.with_locale(locale),
            None => profile,
        }
    }

    /// Apply a value without saving
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let settings = &mut self.settings;
        match key {
            "config_endpoint" => settings.config_endpoint = value.to_string(),
            "store_id" => settings.store_id = value.to_string(),
            "os_name" => settings.os_name = value.to_string(),
            "attribution.app_id" => settings.attribution.app_id = value.to_string(),
            "attribution.dev_key" => settings.attribution.dev_key = value.to_string(),
            "attribution.platform" => settings.attribution.platform = value.to_string(),
            "attribution.requery_base" => settings.attribution.requery_base = value.to_string(),
            "attribution_timeout_ms" => {
                settings.attribution_timeout_ms = value.parse().context("Invalid number")?;
            }
            "organic_grace_ms" => {
                settings.organic_grace_ms = value.parse().context("Invalid number")?;
            }
            "fetch_timeout_ms" => {
                settings.fetch_timeout_ms = match value {
                    "" | "none" => None,
                    _ => Some(value.parse().context("Invalid number")?),
                };
            }
            "bundle_id" => self.bundle_id = value.to_string(),
            "locale" => self.locale = optional(value),
            "attribution_id" => self.attribution_id = optional(value),
            "push_token" => self.push_token = optional(value),
            "project_id" => self.project_id = optional(value),
            "storage_path" => self.storage_path = optional(value),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        self.settings
            .validate()
            .with_context(|| format!("Rejected value for {}", key))?;
        Ok(())
    }

    /// Set a config value and save
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        self.list()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        let s = &self.settings;
        let unset = || "(unset)".to_string();
        vec![
            ("config_endpoint".to_string(), s.config_endpoint.clone()),
            ("store_id".to_string(), s.store_id.clone()),
            ("os_name".to_string(), s.os_name.clone()),
            ("attribution.app_id".to_string(), s.attribution.app_id.clone()),
            ("attribution.dev_key".to_string(), s.attribution.dev_key.clone()),
            ("attribution.platform".to_string(), s.attribution.platform.clone()),
            ("attribution.requery_base".to_string(), s.attribution.requery_base.clone()),
            ("attribution_timeout_ms".to_string(), s.attribution_timeout_ms.to_string()),
            ("organic_grace_ms".to_string(), s.organic_grace_ms.to_string()),
            (
                "fetch_timeout_ms".to_string(),
                s.fetch_timeout_ms
                    .map(|ms| ms.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            ),
            ("bundle_id".to_string(), self.bundle_id.clone()),
            ("locale".to_string(), self.locale.clone().unwrap_or_else(|| "(auto)".to_string())),
            ("attribution_id".to_string(), self.attribution_id.clone().unwrap_or_else(unset)),
            ("push_token".to_string(), self.push_token.clone().unwrap_or_else(unset)),
            ("project_id".to_string(), self.project_id.clone().unwrap_or_else(unset)),
            (
                "storage_path".to_string(),
                self.storage_path.clone().unwrap_or_else(|| "(auto)".to_string()),
            ),
        ]
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
