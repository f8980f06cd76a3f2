//! Key-value store factory for runtime selection

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::DomainError;
use crate::domain::storage::KeyValueStore;

use super::file::FileKeyValueStore;
use super::in_memory::InMemoryKeyValueStore;

/// Supported key-value store types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory store (for testing/development)
    InMemory,
    /// Single JSON document on disk
    File,
}

impl std::str::FromStr for StorageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "file" | "json" => Ok(Self::File),
            _ => Err(DomainError::configuration(format!(
                "Unknown key-value store type: {}. Valid types: memory, file",
                s
            ))),
        }
    }
}

/// Key-value store configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    File(PathBuf),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::File(_) => StorageType::File,
        }
    }
}

/// Factory for creating key-value store instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(Arc::new(InMemoryKeyValueStore::new())),
            StorageConfig::File(path) => Ok(Arc::new(FileKeyValueStore::open(path).await?)),
        }
    }
}
