//! Key-value namespace trait definition

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::domain::DomainError;

/// Persistent key-value namespace provided by the host
///
/// Values are JSON strings so the trait stays dyn-compatible.
/// Use [`KeyValueStoreExt`] for typed access.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Gets a raw JSON value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Stores a raw JSON value, replacing any previous one
    async fn set_raw(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Removes a value, returns true if it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Lists the keys currently stored
    async fn keys(&self) -> Result<Vec<String>, DomainError>;
}

/// Extension trait providing typed get/set operations
pub trait KeyValueStoreExt: KeyValueStore {
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::serialization(format!(
                            "Failed to deserialize value for '{}': {}",
                            key, e
                        ))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::serialization(format!(
                    "Failed to serialize value for '{}': {}",
                    key, e
                ))
            })?;
            self.set_raw(key, &data).await
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}
