use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod settings;
pub mod store;

pub use settings::{SettingKey, Settings};
pub use store::{MemorySettingsStore, SettingsStore};

/// Configuration for chatguard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub settings: Settings,
}

/// Remote classifier endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Timing and gating of the in-page pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,

    #[serde(default = "default_notification_secs")]
    pub notification_secs: u64,
}

/// Local matcher used when the endpoint is unreachable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub extra_words: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            threshold: default_threshold(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_text_len: default_min_text_len(),
            notification_secs: default_notification_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PipelineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}

fn default_endpoint() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_threshold() -> f64 {
    0.5
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_min_text_len() -> usize {
    3
}

fn default_notification_secs() -> u64 {
    5
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing the defaults there if it does not exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Write config to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "chatguard", "chatguard") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.chatguard/config.toml")
        }
    }
}
