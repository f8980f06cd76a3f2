use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::domain::cache::CacheOptions;
use crate::infrastructure::storage::{StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheOptions,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where cache entries and the key-value namespace live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one JSON file per entry
    pub root: PathBuf,
    /// Key-value store backing the index: `memory` or `file`
    pub kv_type: String,
    /// Location of the file store; defaults to `<root>.kv.json` next to `root`
    pub kv_path: Option<PathBuf>,
    pub key_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".cache/ci-analysis"),
            kv_type: "file".to_string(),
            kv_path: None,
            key_prefix: "ciAnalysis".to_string(),
        }
    }
}

impl StorageSettings {
    pub fn kv_config(&self) -> Result<StorageConfig, DomainError> {
        match self.kv_type.parse::<StorageType>()? {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::File => Ok(StorageConfig::file(
                self.kv_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(format!("{}.kv.json", self.root.display()))),
            )),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder
            .add_source(
                config::Environment::with_prefix("ANALYSIS_CACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
