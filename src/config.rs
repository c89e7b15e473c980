use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::WhatsNew;
use crate::store::{Platform, StoreLinks, DEFAULT_TIMEOUT_SECS};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub whats_new: WhatsNewConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// The app being checked
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Running version, when not given on the command line
    #[serde(default)]
    pub current_version: Option<String>,
    /// Store to consult
    #[serde(default)]
    pub platform: Platform,
}

/// Store listing URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub ios_link: Option<String>,
    #[serde(default)]
    pub android_link: Option<String>,
}

impl StoreConfig {
    pub fn links(&self) -> StoreLinks {
        StoreLinks {
            ios: self.ios_link.clone(),
            android: self.android_link.clone(),
        }
    }
}

/// What's-new overlay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsNewConfig {
    /// Announce changes after an update
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Static changelog used instead of the store's release notes
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for WhatsNewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            description: None,
        }
    }
}

impl WhatsNewConfig {
    pub fn to_whats_new(&self) -> WhatsNew {
        WhatsNew {
            enabled: self.enabled,
            description: self.description.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: None,
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "update-overlay", "UpdateOverlay")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Read a value by dotted key (e.g. "store.ios_link")
    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();
        let unset = || "<not set>".to_string();

        match parts.as_slice() {
            ["app", "current_version"] => Ok(self.app.current_version.clone().unwrap_or_else(unset)),
            ["app", "platform"] => Ok(self.app.platform.to_string()),
            ["store", "ios_link"] => Ok(self.store.ios_link.clone().unwrap_or_else(unset)),
            ["store", "android_link"] => Ok(self.store.android_link.clone().unwrap_or_else(unset)),
            ["whats_new", "enabled"] => Ok(self.whats_new.enabled.to_string()),
            ["whats_new", "description"] => {
                Ok(self.whats_new.description.clone().unwrap_or_else(unset))
            }
            ["network", "timeout_secs"] => Ok(self.network.timeout_secs.to_string()),
            ["network", "user_agent"] => Ok(self.network.user_agent.clone().unwrap_or_else(unset)),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    /// Set a value by dotted key. An empty string clears optional values.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let optional = || (!value.is_empty()).then(|| value.to_string());

        match parts.as_slice() {
            ["app", "current_version"] => self.app.current_version = optional(),
            ["app", "platform"] => {
                self.app.platform = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
            ["store", "ios_link"] => self.store.ios_link = optional(),
            ["store", "android_link"] => self.store.android_link = optional(),
            ["whats_new", "enabled"] => self.whats_new.enabled = value.parse()?,
            ["whats_new", "description"] => self.whats_new.description = optional(),
            ["network", "timeout_secs"] => self.network.timeout_secs = value.parse()?,
            ["network", "user_agent"] => self.network.user_agent = optional(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}
