//! File-backed durable tier
//!
//! Each entry lives in `<root>/<hash>.json`. A size-tracked [`CacheIndex`] is
//! mirrored into the host key-value namespace so GC and stats never need to
//! open entry files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::DomainError;
use crate::domain::cache::{CacheEntry, CacheIndex, IndexItem};
use crate::domain::storage::{KeyValueStore, KeyValueStoreExt};

/// Version suffix of the index and options keys in the key-value namespace
pub const INDEX_SCHEMA_VERSION: u32 = 1;

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Where a cache instance keeps its files and index
#[derive(Debug, Clone)]
pub struct CacheLocation {
    pub storage_root: PathBuf,
    pub kv: Arc<dyn KeyValueStore>,
    /// Prefix of the keys this instance owns in the key-value namespace
    pub key_prefix: String,
}

impl CacheLocation {
    pub fn new(
        storage_root: impl Into<PathBuf>,
        kv: Arc<dyn KeyValueStore>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage_root: storage_root.into(),
            kv,
            key_prefix: key_prefix.into(),
        }
    }

    /// Derives a location for one result kind sharing the same namespace
    pub fn scoped(&self, kind: &str) -> Self {
        Self {
            storage_root: self.storage_root.join(kind),
            kv: Arc::clone(&self.kv),
            key_prefix: format!("{}.{}", self.key_prefix, kind),
        }
    }

    pub fn index_key(&self) -> String {
        format!("{}.index.v{}", self.key_prefix, INDEX_SCHEMA_VERSION)
    }

    pub fn options_key(&self) -> String {
        format!("{}.options.v{}", self.key_prefix, INDEX_SCHEMA_VERSION)
    }
}

#[derive(Debug)]
pub struct DurableStore {
    root: PathBuf,
    kv: Arc<dyn KeyValueStore>,
    index_key: String,
    index: Mutex<CacheIndex>,
}

impl DurableStore {
    /// Creates the storage directory if needed and loads the index
    pub async fn open(location: &CacheLocation) -> Result<Self, DomainError> {
        let root = location.storage_root.clone();

        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to create cache directory {}: {}",
                root.display(),
                e
            ))
        })?;

        remove_stale_temp_files(&root).await;

        let index_key = location.index_key();
        let index = load_index(location.kv.as_ref(), &index_key).await;

        debug!(
            root = %root.display(),
            entries = index.len(),
            total_size_bytes = index.total_size_bytes,
            "Durable cache opened"
        );

        Ok(Self {
            root,
            kv: Arc::clone(&location.kv),
            index_key,
            index: Mutex::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Writes an entry atomically and records it in the index
    ///
    /// `entry.size_bytes` is set to the size of the written file.
    pub async fn write_entry<V: Serialize>(
        &self,
        entry: &mut CacheEntry<V>,
    ) -> Result<(), DomainError> {
        let data = encode_sized(entry)?;

        let mut index = self.index.lock().await;
        self.replace_file(&entry.key, &data).await?;
        index.upsert(entry.index_item());
        self.persist_index(&index).await
    }

    /// Rewrites an entry read earlier, unless it was removed or replaced since
    ///
    /// Returns false when the write was skipped.
    pub async fn refresh_entry<V: Serialize>(
        &self,
        entry: &mut CacheEntry<V>,
    ) -> Result<bool, DomainError> {
        let data = encode_sized(entry)?;

        let mut index = self.index.lock().await;

        match index.items.get(&entry.key) {
            Some(item) if item.created_at == entry.created_at => {}
            _ => {
                debug!(key = %entry.key, "Entry changed since it was read, skipping refresh");
                return Ok(false);
            }
        }

        self.replace_file(&entry.key, &data).await?;
        index.upsert(entry.index_item());
        self.persist_index(&index).await?;

        Ok(true)
    }

    /// Reads an entry; missing, unreadable or outdated entries are absent
    pub async fn read_entry<V: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<V>> {
        let path = self.entry_path(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(key, error = %e, "Unreadable cache entry");
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry<V>>(&bytes) {
            Ok(entry) if entry.is_current_schema() && entry.key == key => Some(entry),
            Ok(entry) => {
                debug!(
                    key,
                    schema_version = entry.schema_version,
                    "Ignoring cache entry with mismatched schema or key"
                );
                None
            }
            Err(e) => {
                debug!(key, error = %e, "Corrupt cache entry");
                None
            }
        }
    }

    /// Removes an entry file and its index item; absence is not an error
    pub async fn delete_entry(&self, key: &str) -> Result<bool, DomainError> {
        let mut index = self.index.lock().await;
        self.remove_locked(&mut index, key).await
    }

    /// Removes an expired entry created at `created_at`
    ///
    /// An entry rewritten since it was read is kept.
    pub async fn delete_expired(&self, key: &str, created_at: i64) -> Result<bool, DomainError> {
        let mut index = self.index.lock().await;

        if index
            .items
            .get(key)
            .is_some_and(|item| item.created_at != created_at)
        {
            debug!(key, "Expired entry was replaced, keeping it");
            return Ok(false);
        }

        self.remove_locked(&mut index, key).await
    }

    /// Updates only the recorded access time of an indexed entry
    ///
    /// Returns false if the key is not indexed.
    pub async fn record_access(&self, key: &str, at: i64) -> Result<bool, DomainError> {
        let mut index = self.index.lock().await;

        if !index.touch(key, at) {
            return Ok(false);
        }

        self.persist_index(&index).await?;
        Ok(true)
    }

    /// Evicts least recently accessed entries until the total fits `limit_bytes`
    ///
    /// Returns the evicted keys.
    pub async fn garbage_collect(&self, limit_bytes: u64) -> Result<Vec<String>, DomainError> {
        let mut index = self.index.lock().await;

        if index.total_size_bytes <= limit_bytes {
            return Ok(Vec::new());
        }

        let before = index.total_size_bytes;
        let mut evicted = Vec::new();

        for item in index.oldest_first() {
            if index.total_size_bytes <= limit_bytes {
                break;
            }

            remove_entry_file(&self.entry_path(&item.key)).await;
            index.remove(&item.key);
            evicted.push(item.key);
        }

        self.persist_index(&index).await?;

        info!(
            evicted = evicted.len(),
            before_bytes = before,
            after_bytes = index.total_size_bytes,
            limit_bytes,
            "Cache garbage collection finished"
        );

        Ok(evicted)
    }

    /// Wipes every entry and resets the index
    pub async fn clear_all(&self) -> Result<(), DomainError> {
        let mut index = self.index.lock().await;

        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Failed to remove cache directory {}: {}",
                    self.root.display(),
                    e
                )));
            }
        }

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to recreate cache directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        *index = CacheIndex::default();
        self.persist_index(&index).await
    }

    /// Indexed items ordered from most to least recently accessed
    pub async fn most_recent(&self, limit: usize) -> Vec<IndexItem> {
        let index = self.index.lock().await;
        let mut items = index.oldest_first();
        items.reverse();
        items.truncate(limit);
        items
    }

    /// Number of indexed entries and their total size in bytes
    pub async fn usage(&self) -> (usize, u64) {
        let index = self.index.lock().await;
        (index.len(), index.total_size_bytes)
    }

    pub async fn index_snapshot(&self) -> CacheIndex {
        self.index.lock().await.clone()
    }

    /// Writes `data` to a temp file and renames it over the entry
    ///
    /// Callers hold the index lock.
    async fn replace_file(&self, key: &str, data: &[u8]) -> Result<(), DomainError> {
        let path = self.entry_path(key);
        let temp_path = self.root.join(format!(
            "{}.{}.{}",
            key,
            uuid::Uuid::new_v4(),
            TEMP_EXTENSION
        ));

        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            DomainError::storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DomainError::storage(format!(
                "Failed to move entry into place at {}: {}",
                path.display(),
                e
            )));
        }

        Ok(())
    }

    async fn remove_locked(&self, index: &mut CacheIndex, key: &str) -> Result<bool, DomainError> {
        let file_removed = remove_entry_file(&self.entry_path(key)).await;

        if index.remove(key).is_none() {
            return Ok(file_removed);
        }

        self.persist_index(index).await?;
        Ok(true)
    }

    async fn persist_index(&self, index: &CacheIndex) -> Result<(), DomainError> {
        self.kv.set(&self.index_key, index).await
    }
}

async fn load_index(kv: &dyn KeyValueStore, key: &str) -> CacheIndex {
    match kv.get::<CacheIndex>(key).await {
        Ok(Some(mut index)) => {
            let recorded = index.total_size_bytes;

            if index.repair_total() {
                warn!(
                    recorded,
                    computed = index.total_size_bytes,
                    "Cache index total did not match its items, repaired"
                );
            }

            index
        }
        Ok(None) => CacheIndex::default(),
        Err(e) => {
            warn!(key, error = %e, "Failed to load cache index, starting empty");
            CacheIndex::default()
        }
    }
}

/// Serializes an entry with its own serialized size embedded
fn encode_sized<V: Serialize>(entry: &mut CacheEntry<V>) -> Result<Vec<u8>, DomainError> {
    entry.size_bytes = 0;

    loop {
        let data = serde_json::to_vec(entry).map_err(|e| {
            DomainError::serialization(format!("Failed to serialize cache entry: {}", e))
        })?;
        let size = data.len() as u64;

        // Embedding the size can change the length by a digit, so re-encode until stable
        if entry.size_bytes == size {
            return Ok(data);
        }

        entry.size_bytes = size;
    }
}

/// Best-effort file removal; returns true if a file was removed
async fn remove_entry_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove cache entry file");
            false
        }
    }
}

async fn remove_stale_temp_files(root: &Path) {
    let Ok(mut dir) = tokio::fs::read_dir(root).await else {
        return;
    };

    while let Ok(Some(item)) = dir.next_entry().await {
        let path = item.path();

        if path.extension().and_then(|e| e.to_str()) == Some(TEMP_EXTENSION) {
            debug!(path = %path.display(), "Removing stale temp file");
            let _ = tokio::fs::remove_file(&path).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{ENTRY_SCHEMA_VERSION, KeyParts, compute_key_hash};
    use crate::domain::storage::MockKeyValueStore;

    fn location(dir: &Path, kv: Arc<MockKeyValueStore>) -> CacheLocation {
        CacheLocation::new(dir.join("cache"), kv, "ciAnalysis.summary")
    }

    fn entry(key: &str, payload: String, last_access_at: i64) -> CacheEntry<String> {
        CacheEntry {
            schema_version: ENTRY_SCHEMA_VERSION,
            key: key.to_string(),
            namespace: "summary".to_string(),
            model: "gpt-4o".to_string(),
            system_prompt_version: "v1".to_string(),
            preprocessing: None,
            created_at: last_access_at,
            last_access_at,
            ttl_ms: None,
            prompt_preview: "prompt".to_string(),
            prompt_hash: "hash".to_string(),
            size_bytes: 0,
            result: payload,
            raw: None,
        }
    }

    async fn open(dir: &Path) -> (DurableStore, Arc<MockKeyValueStore>) {
        let kv = Arc::new(MockKeyValueStore::new());
        let store = DurableStore::open(&location(dir, kv.clone())).await.unwrap();
        (store, kv)
    }

    #[test]
    fn test_location_keys() {
        let kv = Arc::new(MockKeyValueStore::new());
        let base = CacheLocation::new("/tmp/cache", kv, "ciAnalysis");
        assert_eq!(base.index_key(), "ciAnalysis.index.v1");
        assert_eq!(base.options_key(), "ciAnalysis.options.v1");

        let scoped = base.scoped("summary");
        assert_eq!(scoped.index_key(), "ciAnalysis.summary.index.v1");
        assert_eq!(scoped.storage_root, PathBuf::from("/tmp/cache/summary"));
    }

    #[tokio::test]
    async fn test_write_embeds_true_size() {
        let dir = tempfile::tempdir().unwrap();
        let (store, kv) = open(dir.path()).await;

        let mut e = entry("a", "x".repeat(1_000), 1);
        store.write_entry(&mut e).await.unwrap();

        let on_disk = tokio::fs::metadata(store.entry_path("a")).await.unwrap().len();
        assert_eq!(e.size_bytes, on_disk);

        let read: CacheEntry<String> = store.read_entry("a").await.unwrap();
        assert_eq!(read.size_bytes, on_disk);
        assert_eq!(store.usage().await, (1, on_disk));
        assert!(kv.value("ciAnalysis.summary.index.v1").is_some());
    }

    #[tokio::test]
    async fn test_rewrite_adjusts_total_by_delta() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut small = entry("a", "x".repeat(10), 1);
        store.write_entry(&mut small).await.unwrap();
        let mut large = entry("a", "x".repeat(500), 2);
        store.write_entry(&mut large).await.unwrap();

        let index = store.index_snapshot().await;
        assert_eq!(index.len(), 1);
        assert_eq!(index.total_size_bytes, large.size_bytes);
        assert_eq!(index.total_size_bytes, index.computed_total());
    }

    #[tokio::test]
    async fn test_read_missing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        assert!(store.read_entry::<String>("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        tokio::fs::write(store.entry_path("bad"), b"{not json")
            .await
            .unwrap();

        assert!(store.read_entry::<String>("bad").await.is_none());
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut e = entry("old", "value".to_string(), 1);
        e.schema_version = ENTRY_SCHEMA_VERSION + 1;
        let data = serde_json::to_vec(&e).unwrap();
        tokio::fs::write(store.entry_path("old"), data).await.unwrap();

        assert!(store.read_entry::<String>("old").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut e = entry("a", "value".to_string(), 1);
        store.write_entry(&mut e).await.unwrap();

        assert!(store.delete_entry("a").await.unwrap());
        assert!(!store.entry_path("a").exists());
        assert_eq!(store.usage().await, (0, 0));
        assert!(!store.delete_entry("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_skips_deleted_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut e = entry("a", "value".to_string(), 1);
        store.write_entry(&mut e).await.unwrap();

        let mut read: CacheEntry<String> = store.read_entry("a").await.unwrap();
        store.delete_entry("a").await.unwrap();

        read.last_access_at = 50;
        assert!(!store.refresh_entry(&mut read).await.unwrap());
        assert!(!store.entry_path("a").exists());
        assert_eq!(store.usage().await, (0, 0));
    }

    #[tokio::test]
    async fn test_refresh_skips_replaced_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut old = entry("a", "old".to_string(), 1);
        store.write_entry(&mut old).await.unwrap();
        let mut read: CacheEntry<String> = store.read_entry("a").await.unwrap();

        let mut newer = entry("a", "newer".to_string(), 2);
        store.write_entry(&mut newer).await.unwrap();

        read.last_access_at = 3;
        assert!(!store.refresh_entry(&mut read).await.unwrap());
        let current: CacheEntry<String> = store.read_entry("a").await.unwrap();
        assert_eq!(current.result, "newer");
    }

    #[tokio::test]
    async fn test_refresh_updates_indexed_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut e = entry("a", "value".to_string(), 1);
        store.write_entry(&mut e).await.unwrap();

        let mut read: CacheEntry<String> = store.read_entry("a").await.unwrap();
        read.last_access_at = 9;
        assert!(store.refresh_entry(&mut read).await.unwrap());
        assert_eq!(store.index_snapshot().await.items["a"].last_access_at, 9);
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_replaced_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut old = entry("a", "old".to_string(), 1);
        store.write_entry(&mut old).await.unwrap();
        let mut newer = entry("a", "newer".to_string(), 2);
        store.write_entry(&mut newer).await.unwrap();

        assert!(!store.delete_expired("a", 1).await.unwrap());
        assert!(store.entry_path("a").exists());

        assert!(store.delete_expired("a", 2).await.unwrap());
        assert!(!store.entry_path("a").exists());
    }

    #[tokio::test]
    async fn test_record_access_reports_unindexed_key() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        assert!(!store.record_access("missing", 5).await.unwrap());
    }

    #[tokio::test]
    async fn test_garbage_collect_under_budget_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (store, kv) = open(dir.path()).await;

        let mut e = entry("a", "value".to_string(), 1);
        store.write_entry(&mut e).await.unwrap();
        let writes = kv.write_count();

        let evicted = store.garbage_collect(1_048_576).await.unwrap();
        assert!(evicted.is_empty());
        assert_eq!(kv.write_count(), writes);
    }

    #[tokio::test]
    async fn test_garbage_collect_evicts_least_recently_accessed() {
        let dir = tempfile::tempdir().unwrap();
        let (store, kv) = open(dir.path()).await;
        let limit = 1_048_576;

        let mut a = entry("a", "a".repeat(600_000), 1_000);
        let mut b = entry("b", "b".repeat(300_000), 2_000);
        let mut c = entry("c", "c".repeat(300_000), 3_000);
        store.write_entry(&mut a).await.unwrap();
        store.write_entry(&mut b).await.unwrap();
        store.write_entry(&mut c).await.unwrap();
        store.record_access("a", 4_000).await.unwrap();

        let writes = kv.write_count();
        let evicted = store.garbage_collect(limit).await.unwrap();

        assert_eq!(evicted, vec!["b".to_string()]);
        assert_eq!(kv.write_count(), writes + 1);
        assert!(!store.entry_path("b").exists());
        assert!(store.entry_path("a").exists());
        assert!(store.entry_path("c").exists());

        let (count, total) = store.usage().await;
        assert_eq!(count, 2);
        assert!(total <= limit);
    }

    #[tokio::test]
    async fn test_garbage_collect_never_evicts_newest_while_older_remain() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            let mut e = entry(key, "z".repeat(1_000), i as i64);
            store.write_entry(&mut e).await.unwrap();
        }

        let one = store.index_snapshot().await.items["a"].size_bytes;
        let evicted = store.garbage_collect(one * 2).await.unwrap();

        assert_eq!(evicted, vec!["a".to_string(), "b".to_string()]);
        assert!(store.entry_path("d").exists());
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(MockKeyValueStore::new());
        let loc = location(dir.path(), kv.clone());

        let store = DurableStore::open(&loc).await.unwrap();
        let key = compute_key_hash(&KeyParts::new("summary", "m", "v1", "p"));
        let mut e = entry(&key, "value".to_string(), 5);
        store.write_entry(&mut e).await.unwrap();
        drop(store);

        let reopened = DurableStore::open(&loc).await.unwrap();
        assert_eq!(reopened.usage().await, (1, e.size_bytes));
        assert!(reopened.read_entry::<String>(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_inconsistent_index_is_repaired_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(MockKeyValueStore::new().with_value(
            "ciAnalysis.summary.index.v1",
            r#"{"items":{"a":{"key":"a","sizeBytes":10,"lastAccessAt":1,"createdAt":1}},"totalSizeBytes":999}"#,
        ));

        let store = DurableStore::open(&location(dir.path(), kv)).await.unwrap();
        assert_eq!(store.usage().await, (1, 10));
    }

    #[tokio::test]
    async fn test_unreadable_index_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(MockKeyValueStore::new().with_read_error("unavailable"));

        let store = DurableStore::open(&location(dir.path(), kv)).await.unwrap();
        assert_eq!(store.usage().await, (0, 0));
    }

    #[tokio::test]
    async fn test_open_removes_stale_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(root.join("a.1234.tmp"), b"partial").await.unwrap();

        let _ = open(dir.path()).await;
        assert!(!root.join("a.1234.tmp").exists());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        let mut e = entry("a", "value".to_string(), 1);
        store.write_entry(&mut e).await.unwrap();

        store.clear_all().await.unwrap();
        assert!(store.root().exists());
        assert!(!store.entry_path("a").exists());
        assert_eq!(store.usage().await, (0, 0));
    }

    #[tokio::test]
    async fn test_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open(dir.path()).await;

        for (key, at) in [("a", 1), ("b", 3), ("c", 2)] {
            let mut e = entry(key, "v".to_string(), at);
            store.write_entry(&mut e).await.unwrap();
        }

        let keys: Vec<String> = store.most_recent(2).await.into_iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_write_failure_on_index_persist_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (store, kv) = open(dir.path()).await;
        kv.fail_writes(Some("quota exceeded"));

        let mut e = entry("a", "value".to_string(), 1);
        assert!(store.write_entry(&mut e).await.is_err());
    }
}
