//! Analysis result caching service
//!
//! Two tiers sit in front of the model call: a bounded in-memory
//! [`RecencyCache`] and a file-backed [`DurableStore`]. Concurrent requests
//! for the same content hash are collapsed by a [`Coalescer`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::domain::DomainError;
use crate::domain::cache::{
    CacheEntry, CacheOptions, CacheablePredicate, Clock, ENTRY_SCHEMA_VERSION, KeyParts,
    SystemClock, compute_key_hash, effective_ttl_ms, is_expired, is_key_hash, non_empty,
    prompt_preview, sha256_hex,
};
use crate::domain::storage::KeyValueStoreExt;
use crate::infrastructure::cache::{CacheLocation, Coalescer, DurableStore, RecencyCache};
use crate::infrastructure::observability::{
    CacheTier, LookupOutcome, record_cache_evictions, record_cache_lookup, record_producer_call,
};

/// Bounds required of a cached result type
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub enabled: bool,
    /// Entries in the durable tier
    pub entries: usize,
    /// Approximate disk usage of the durable tier
    pub disk_bytes: u64,
    pub memory_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub in_flight: usize,
}

#[derive(Debug, Clone)]
struct MemoryEntry<V> {
    value: V,
    created_at: i64,
    ttl_ms: Option<u64>,
}

struct CacheInner<V> {
    name: String,
    options: CacheOptions,
    store: DurableStore,
    memory: RecencyCache<MemoryEntry<V>>,
    in_flight: Coalescer<V>,
    clock: Arc<dyn Clock>,
    is_cacheable: CacheablePredicate<V>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Two-tier cache for one kind of analysis result
///
/// Cheap to clone; clones share the same tiers and counters.
pub struct AnalysisCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for AnalysisCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for AnalysisCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .field("root", &self.inner.store.root())
            .finish()
    }
}

/// Builder for [`AnalysisCache`]; `init` opens the durable tier
pub struct AnalysisCacheBuilder<V> {
    location: CacheLocation,
    options: CacheOptions,
    clock: Arc<dyn Clock>,
    is_cacheable: CacheablePredicate<V>,
    warmup_on_init: bool,
}

impl<V: CacheValue> AnalysisCacheBuilder<V> {
    pub fn options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the default "non-empty" check deciding which results are cached
    pub fn cacheable_when(
        mut self,
        predicate: impl Fn(&V) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_cacheable = Arc::new(predicate);
        self
    }

    /// Whether `init` loads recent entries into memory; the persisted options are unaffected
    pub fn warmup_on_init(mut self, enabled: bool) -> Self {
        self.warmup_on_init = enabled;
        self
    }

    /// Opens storage, loads the index, collects garbage and warms memory
    pub async fn init(self) -> Result<AnalysisCache<V>, DomainError> {
        let Self {
            location,
            options,
            clock,
            is_cacheable,
            warmup_on_init,
        } = self;

        options.validate()?;

        let store = DurableStore::open(&location).await?;

        if let Err(e) = location.kv.set(&location.options_key(), &options).await {
            warn!(cache = %location.key_prefix, error = %e, "Failed to persist cache options");
        }

        let cache = AnalysisCache {
            inner: Arc::new(CacheInner {
                name: location.key_prefix.clone(),
                memory: RecencyCache::new(options.memory_limit),
                options,
                store,
                in_flight: Coalescer::new(),
                clock,
                is_cacheable,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        };

        cache.collect_garbage().await;

        let warmed = if cache.inner.options.enabled && warmup_on_init {
            cache.warmup(cache.inner.options.warmup_top_k).await
        } else {
            0
        };

        let (entries, disk_bytes) = cache.inner.store.usage().await;
        info!(
            cache = %cache.inner.name,
            root = %cache.inner.store.root().display(),
            enabled = cache.inner.options.enabled,
            entries,
            disk_bytes,
            warmed,
            "Analysis cache initialized"
        );

        Ok(cache)
    }
}

impl<V: CacheValue> AnalysisCache<V> {
    pub fn builder(location: CacheLocation) -> AnalysisCacheBuilder<V> {
        AnalysisCacheBuilder {
            location,
            options: CacheOptions::default(),
            clock: Arc::new(SystemClock),
            is_cacheable: Arc::new(non_empty::<V>),
            warmup_on_init: true,
        }
    }

    /// Initializes a cache with the system clock and default cacheability check
    pub async fn init(location: CacheLocation, options: CacheOptions) -> Result<Self, DomainError> {
        Self::builder(location).options(options).init().await
    }

    /// Reads the options persisted by the last `init` at this location
    pub async fn persisted_options(location: &CacheLocation) -> Option<CacheOptions> {
        match location.kv.get::<CacheOptions>(&location.options_key()).await {
            Ok(options) => options,
            Err(e) => {
                debug!(error = %e, "Persisted cache options unreadable");
                None
            }
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.options.enabled
    }

    /// Looks up a result; storage problems are reported as a miss
    pub async fn get(&self, parts: &KeyParts) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }

        let key = compute_key_hash(parts);
        self.lookup(&key, parts.ttl_override_ms).await
    }

    async fn lookup(&self, key: &str, ttl_override_ms: Option<u64>) -> Option<V> {
        let inner = &self.inner;
        let now = inner.clock.now_millis();

        if let Some(entry) = inner.memory.get(key) {
            let ttl = effective_ttl_ms(ttl_override_ms, entry.ttl_ms, inner.options.ttl_ms);

            let indexed = if is_expired(entry.created_at, ttl, now) {
                false
            } else {
                match inner.store.record_access(key, now).await {
                    Ok(indexed) => indexed,
                    Err(e) => {
                        warn!(
                            cache = %inner.name,
                            key,
                            error = %e,
                            "Failed to refresh access time"
                        );
                        true
                    }
                }
            };

            if indexed {
                inner.memory.record_access(key);
                self.record_hit(CacheTier::Memory);
                debug!(cache = %inner.name, key, "Memory cache hit");
                return Some(entry.value);
            }

            // Expired, or removed from disk after it was remembered
            inner.memory.remove(key);
        }

        let Some(mut entry) = inner.store.read_entry::<V>(key).await else {
            self.record_miss(CacheTier::Disk, LookupOutcome::Miss);
            debug!(cache = %inner.name, key, "Cache miss");
            return None;
        };

        if entry.is_expired(now, ttl_override_ms, inner.options.ttl_ms) {
            debug!(cache = %inner.name, key, created_at = entry.created_at, "Cache entry expired");

            if let Err(e) = inner.store.delete_expired(key, entry.created_at).await {
                warn!(cache = %inner.name, key, error = %e, "Failed to delete expired entry");
            }

            self.record_miss(CacheTier::Disk, LookupOutcome::Expired);
            return None;
        }

        entry.last_access_at = now;

        let promote = match inner.store.refresh_entry(&mut entry).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(cache = %inner.name, key, error = %e, "Failed to refresh cache entry");
                true
            }
        };

        // A concurrent delete or rewrite wins over this read
        if promote {
            self.remember(key, entry.result.clone(), entry.created_at, entry.ttl_ms);
        }

        self.record_hit(CacheTier::Disk);
        debug!(cache = %inner.name, key, "Disk cache hit");

        Some(entry.result)
    }

    /// Stores a result in both tiers
    ///
    /// `raw` is kept only when `saveRaw` is enabled. Failures writing the
    /// durable tier are returned to the caller.
    pub async fn set(
        &self,
        parts: &KeyParts,
        value: V,
        raw: Option<serde_json::Value>,
    ) -> Result<(), DomainError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let inner = &self.inner;
        let key = compute_key_hash(parts);
        let now = inner.clock.now_millis();

        let mut entry = CacheEntry {
            schema_version: ENTRY_SCHEMA_VERSION,
            key: key.clone(),
            namespace: parts.namespace.clone(),
            model: parts.model.clone(),
            system_prompt_version: parts.system_prompt_version.clone(),
            preprocessing: parts.preprocessing,
            created_at: now,
            last_access_at: now,
            ttl_ms: parts.ttl_override_ms,
            prompt_preview: prompt_preview(&parts.prompt),
            prompt_hash: sha256_hex(&parts.prompt),
            size_bytes: 0,
            result: value,
            raw: raw.filter(|_| inner.options.save_raw),
        };

        inner.store.write_entry(&mut entry).await?;
        debug!(cache = %inner.name, key = %key, size_bytes = entry.size_bytes, "Cached result");

        self.remember(&key, entry.result, now, entry.ttl_ms);
        self.collect_garbage().await;

        Ok(())
    }

    /// Returns the cached result or computes it once for all concurrent callers
    pub async fn get_or_compute<F, Fut>(
        &self,
        parts: &KeyParts,
        producer: F,
    ) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        self.get_or_compute_with_raw(parts, move || {
            let computation = producer();
            async move { computation.await.map(|value| (value, None)) }
        })
        .await
    }

    /// Like [`AnalysisCache::get_or_compute`], for producers that also return
    /// the raw model payload
    pub async fn get_or_compute_with_raw<F, Fut>(
        &self,
        parts: &KeyParts,
        producer: F,
    ) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(V, Option<serde_json::Value>), DomainError>> + Send + 'static,
    {
        if !self.is_enabled() {
            return producer().await.map(|(value, _)| value);
        }

        let key = compute_key_hash(parts);
        let cache = self.clone();
        let parts = parts.clone();

        self.inner
            .in_flight
            .run(&key, move || async move {
                // A sibling may have finished and written just before this slot opened
                if let Some(value) = cache.get(&parts).await {
                    return Ok(value);
                }

                let produced = producer().await;
                record_producer_call(&cache.inner.name, produced.is_ok());

                let (value, raw) = match produced {
                    Ok(produced) => produced,
                    Err(e) => return Err(e),
                };

                if (cache.inner.is_cacheable)(&value) {
                    if let Err(e) = cache.set(&parts, value.clone(), raw).await {
                        warn!(
                            cache = %cache.inner.name,
                            error = %e,
                            "Failed to cache computed result"
                        );
                    }
                } else {
                    debug!(cache = %cache.inner.name, "Result not cacheable, skipping write");
                }

                Ok(value)
            })
            .await
    }

    /// Removes one entry from both tiers; anything but a key hash is absent
    pub async fn del_by_key_hash(&self, key: &str) -> Result<bool, DomainError> {
        if !is_key_hash(key) {
            debug!(cache = %self.inner.name, key, "Ignoring delete of malformed key");
            return Ok(false);
        }

        let on_disk = self.inner.store.delete_entry(key).await?;
        let in_memory = self.inner.memory.remove(key);
        Ok(in_memory || on_disk)
    }

    /// Reads a durable entry with its metadata without touching recency
    pub async fn entry_by_key_hash(&self, key: &str) -> Option<CacheEntry<V>> {
        if !is_key_hash(key) {
            return None;
        }

        self.inner.store.read_entry(key).await
    }

    /// Empties both tiers and resets counters
    pub async fn clear_all(&self) -> Result<(), DomainError> {
        self.inner.memory.clear();
        self.inner.store.clear_all().await?;
        self.inner.hits.store(0, Ordering::Relaxed);
        self.inner.misses.store(0, Ordering::Relaxed);

        info!(cache = %self.inner.name, "Analysis cache cleared");
        Ok(())
    }

    pub async fn stats(&self) -> CacheStats {
        let (entries, disk_bytes) = self.inner.store.usage().await;

        CacheStats {
            enabled: self.is_enabled(),
            entries,
            disk_bytes,
            memory_entries: self.inner.memory.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            in_flight: self.inner.in_flight.in_flight(),
        }
    }

    /// Loads the most recently used, unexpired durable entries into memory
    ///
    /// Returns the number of entries loaded.
    pub async fn warmup(&self, top_k: usize) -> usize {
        let inner = &self.inner;
        let limit = top_k.min(inner.memory.capacity());

        if limit == 0 {
            return 0;
        }

        let now = inner.clock.now_millis();
        let candidates = inner.store.most_recent(usize::MAX).await;
        let mut loaded = Vec::with_capacity(limit);

        for item in candidates {
            if loaded.len() >= limit {
                break;
            }

            match inner.store.read_entry::<V>(&item.key).await {
                Some(entry) if !entry.is_expired(now, None, inner.options.ttl_ms) => {
                    loaded.push(entry)
                }
                _ => continue,
            }
        }

        let count = loaded.len();

        // Least recent first so the most recent entry ends up at the front of the queue
        for entry in loaded.into_iter().rev() {
            self.remember(&entry.key, entry.result, entry.created_at, entry.ttl_ms);
        }

        debug!(cache = %inner.name, loaded = count, "Warmup finished");
        count
    }

    fn remember(&self, key: &str, value: V, created_at: i64, ttl_ms: Option<u64>) {
        let evicted = self.inner.memory.insert(
            key,
            MemoryEntry {
                value,
                created_at,
                ttl_ms,
            },
        );

        if let Some(evicted) = evicted {
            debug!(cache = %self.inner.name, key = %evicted, "Evicted from memory cache");
        }
    }

    async fn collect_garbage(&self) {
        let limit = self.inner.options.disk_limit_bytes();

        match self.inner.store.garbage_collect(limit).await {
            Ok(evicted) => {
                for key in &evicted {
                    self.inner.memory.remove(key);
                }
                record_cache_evictions(&self.inner.name, evicted.len());
            }
            Err(e) => {
                warn!(cache = %self.inner.name, error = %e, "Cache garbage collection failed");
            }
        }
    }

    fn record_hit(&self, tier: CacheTier) {
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
        record_cache_lookup(&self.inner.name, tier, LookupOutcome::Hit);
    }

    fn record_miss(&self, tier: CacheTier, outcome: LookupOutcome) {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        record_cache_lookup(&self.inner.name, tier, outcome);
    }
}
