//! File-backed key-value store
//!
//! Keeps the whole namespace in one JSON document, rewritten atomically on
//! every change. Intended for the small amount of state a host keeps per
//! installation (cache index and options), not for bulk data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::DomainError;
use crate::domain::storage::KeyValueStore;

#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`, creating parent directories as needed
    ///
    /// A missing file starts an empty namespace. An unreadable file is an
    /// error rather than being silently discarded.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                DomainError::serialization(format!(
                    "Failed to parse key-value file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Failed to read key-value file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), DomainError> {
        let data = serde_json::to_vec_pretty(values)
            .map_err(|e| DomainError::serialization(format!("Failed to encode values: {}", e)))?;

        let temp_path = self.path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&temp_path, &data).await.map_err(|e| {
            DomainError::storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;

        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            DomainError::storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value.to_string());
        self.flush(&values).await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut values = self.values.lock().await;

        if values.remove(key).is_none() {
            return Ok(false);
        }

        self.flush(&values).await?;
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.values.lock().await.keys().cloned().collect())
    }
}
