//! Late-bound access to an analysis cache
//!
//! Subsystems are usually wired before the cache finishes initializing. A
//! [`CacheHandle`] can be cloned into them up front; every operation fails
//! with [`DomainError::NotInitialized`] until `init` has completed.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::domain::DomainError;
use crate::domain::cache::{CacheOptions, KeyParts};
use crate::infrastructure::cache::CacheLocation;

use super::analysis_cache_service::{AnalysisCache, CacheStats, CacheValue};

pub struct CacheHandle<V> {
    name: &'static str,
    cell: Arc<OnceCell<AnalysisCache<V>>>,
}

impl<V> Clone for CacheHandle<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V> std::fmt::Debug for CacheHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle")
            .field("name", &self.name)
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

impl<V: CacheValue> CacheHandle<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Initializes the cache once; later calls return the existing instance
    pub async fn init(
        &self,
        location: CacheLocation,
        options: CacheOptions,
    ) -> Result<AnalysisCache<V>, DomainError> {
        self.cell
            .get_or_try_init(|| AnalysisCache::init(location, options))
            .await
            .cloned()
    }

    /// Installs an already initialized cache; returns false if one was present
    pub fn install(&self, cache: AnalysisCache<V>) -> bool {
        self.cell.set(cache).is_ok()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn cache(&self) -> Result<&AnalysisCache<V>, DomainError> {
        self.cell
            .get()
            .ok_or_else(|| DomainError::not_initialized(self.name))
    }

    pub async fn get(&self, parts: &KeyParts) -> Result<Option<V>, DomainError> {
        Ok(self.cache()?.get(parts).await)
    }

    pub async fn set(
        &self,
        parts: &KeyParts,
        value: V,
        raw: Option<serde_json::Value>,
    ) -> Result<(), DomainError> {
        self.cache()?.set(parts, value, raw).await
    }

    pub async fn get_or_compute<F, Fut>(
        &self,
        parts: &KeyParts,
        producer: F,
    ) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        self.cache()?.get_or_compute(parts, producer).await
    }

    pub async fn warmup(&self, top_k: usize) -> Result<usize, DomainError> {
        Ok(self.cache()?.warmup(top_k).await)
    }

    pub async fn del_by_key_hash(&self, key: &str) -> Result<bool, DomainError> {
        self.cache()?.del_by_key_hash(key).await
    }

    pub async fn clear_all(&self) -> Result<(), DomainError> {
        self.cache()?.clear_all().await
    }

    pub async fn stats(&self) -> Result<CacheStats, DomainError> {
        Ok(self.cache()?.stats().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::MockKeyValueStore;

    fn location(dir: &std::path::Path) -> CacheLocation {
        CacheLocation::new(dir.join("cache"), Arc::new(MockKeyValueStore::new()), "ciAnalysis")
    }

    #[tokio::test]
    async fn test_operations_fail_before_init() {
        let handle: CacheHandle<String> = CacheHandle::new("summary cache");
        let parts = KeyParts::new("summary", "m", "v1", "prompt");

        let err = handle.get(&parts).await.unwrap_err();
        assert_eq!(err, DomainError::not_initialized("summary cache"));

        assert!(handle.set(&parts, "x".to_string(), None).await.unwrap_err().is_not_initialized());
        assert!(handle.stats().await.unwrap_err().is_not_initialized());
        assert!(handle.clear_all().await.unwrap_err().is_not_initialized());
        assert!(handle.warmup(5).await.unwrap_err().is_not_initialized());
        assert!(handle.del_by_key_hash("abc").await.unwrap_err().is_not_initialized());

        let computed = handle
            .get_or_compute(&parts, || async { Ok("never".to_string()) })
            .await;
        assert!(computed.unwrap_err().is_not_initialized());
    }

    #[tokio::test]
    async fn test_clones_observe_init() {
        let dir = tempfile::tempdir().unwrap();
        let handle: CacheHandle<String> = CacheHandle::new("summary cache");
        let wired = handle.clone();
        let parts = KeyParts::new("summary", "m", "v1", "prompt");

        handle
            .init(location(dir.path()), CacheOptions::default())
            .await
            .unwrap();

        assert!(wired.is_initialized());
        wired.set(&parts, "cached".to_string(), None).await.unwrap();
        assert_eq!(handle.get(&parts).await.unwrap().as_deref(), Some("cached"));
        assert_eq!(wired.stats().await.unwrap().entries, 1);
    }

    #[tokio::test]
    async fn test_install_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let handle: CacheHandle<String> = CacheHandle::new("summary cache");

        let cache = AnalysisCache::init(location(dir.path()), CacheOptions::default())
            .await
            .unwrap();

        assert!(handle.install(cache.clone()));
        assert!(!handle.install(cache));
    }
}
