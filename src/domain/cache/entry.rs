//! Durable cache entry and index types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::key::PreprocessingDescriptor;

/// Version of the on-disk entry format; entries with another version are ignored
pub const ENTRY_SCHEMA_VERSION: u32 = 1;

/// Maximum number of prompt characters kept for humans inspecting the store
pub const PROMPT_PREVIEW_CHARS: usize = 200;

/// A cached analysis result as persisted in `<root>/<hash>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    pub schema_version: u32,
    pub key: String,
    pub namespace: String,
    pub model: String,
    pub system_prompt_version: String,
    #[serde(default)]
    pub preprocessing: Option<PreprocessingDescriptor>,
    pub created_at: i64,
    pub last_access_at: i64,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    pub prompt_preview: String,
    pub prompt_hash: String,
    /// Serialized size of this entry, embedded after sizing
    pub size_bytes: u64,
    pub result: V,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl<V> CacheEntry<V> {
    pub fn is_current_schema(&self) -> bool {
        self.schema_version == ENTRY_SCHEMA_VERSION
    }

    pub fn index_item(&self) -> IndexItem {
        IndexItem {
            key: self.key.clone(),
            size_bytes: self.size_bytes,
            last_access_at: self.last_access_at,
            created_at: self.created_at,
        }
    }

    /// Effective TTL: request override, then the stored TTL, then the default
    pub fn effective_ttl_ms(&self, request_override: Option<u64>, default_ttl_ms: u64) -> u64 {
        effective_ttl_ms(request_override, self.ttl_ms, default_ttl_ms)
    }

    pub fn is_expired(&self, now: i64, request_override: Option<u64>, default_ttl_ms: u64) -> bool {
        is_expired(
            self.created_at,
            self.effective_ttl_ms(request_override, default_ttl_ms),
            now,
        )
    }
}

pub fn effective_ttl_ms(
    request_override: Option<u64>,
    stored: Option<u64>,
    default_ttl_ms: u64,
) -> u64 {
    request_override.or(stored).unwrap_or(default_ttl_ms)
}

/// An entry is expired once its age strictly exceeds the TTL
pub fn is_expired(created_at: i64, ttl_ms: u64, now: i64) -> bool {
    let age = now.saturating_sub(created_at);
    age > 0 && age as u64 > ttl_ms
}

/// Truncates a prompt to a bounded, char-safe preview
pub fn prompt_preview(prompt: &str) -> String {
    prompt.chars().take(PROMPT_PREVIEW_CHARS).collect()
}

/// Lightweight summary of an entry used for GC and stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexItem {
    pub key: String,
    pub size_bytes: u64,
    pub last_access_at: i64,
    pub created_at: i64,
}

/// Size-tracked index of all durable entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheIndex {
    pub items: HashMap<String, IndexItem>,
    pub total_size_bytes: u64,
}

impl CacheIndex {
    /// Inserts or replaces an item, adjusting the total by the size delta
    pub fn upsert(&mut self, item: IndexItem) {
        let previous = self.items.insert(item.key.clone(), item.clone());
        let previous_size = previous.map(|p| p.size_bytes).unwrap_or(0);

        self.total_size_bytes = self
            .total_size_bytes
            .saturating_sub(previous_size)
            .saturating_add(item.size_bytes);
    }

    pub fn remove(&mut self, key: &str) -> Option<IndexItem> {
        let removed = self.items.remove(key)?;
        self.total_size_bytes = self.total_size_bytes.saturating_sub(removed.size_bytes);
        Some(removed)
    }

    pub fn touch(&mut self, key: &str, at: i64) -> bool {
        match self.items.get_mut(key) {
            Some(item) => {
                item.last_access_at = at;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn computed_total(&self) -> u64 {
        self.items.values().map(|i| i.size_bytes).sum()
    }

    /// Recomputes the total from the items; returns true if it was wrong
    pub fn repair_total(&mut self) -> bool {
        let computed = self.computed_total();
        let repaired = computed != self.total_size_bytes;
        self.total_size_bytes = computed;
        repaired
    }

    /// Items ordered from least to most recently accessed
    pub fn oldest_first(&self) -> Vec<IndexItem> {
        let mut items: Vec<IndexItem> = self.items.values().cloned().collect();
        items.sort_by(|a, b| {
            a.last_access_at
                .cmp(&b.last_access_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.key.cmp(&b.key))
        });
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, size: u64, last_access_at: i64) -> IndexItem {
        IndexItem {
            key: key.to_string(),
            size_bytes: size,
            last_access_at,
            created_at: 0,
        }
    }

    #[test]
    fn test_upsert_tracks_total() {
        let mut index = CacheIndex::default();
        index.upsert(item("a", 100, 1));
        index.upsert(item("b", 50, 2));
        assert_eq!(index.total_size_bytes, 150);

        index.upsert(item("a", 70, 3));
        assert_eq!(index.total_size_bytes, 120);
        assert_eq!(index.total_size_bytes, index.computed_total());
    }

    #[test]
    fn test_remove_tracks_total() {
        let mut index = CacheIndex::default();
        index.upsert(item("a", 100, 1));

        assert!(index.remove("a").is_some());
        assert!(index.remove("a").is_none());
        assert_eq!(index.total_size_bytes, 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_repair_total() {
        let mut index = CacheIndex::default();
        index.upsert(item("a", 100, 1));
        index.total_size_bytes = 7;

        assert!(index.repair_total());
        assert_eq!(index.total_size_bytes, 100);
        assert!(!index.repair_total());
    }

    #[test]
    fn test_oldest_first() {
        let mut index = CacheIndex::default();
        index.upsert(item("new", 1, 30));
        index.upsert(item("old", 1, 10));
        index.upsert(item("mid", 1, 20));

        let keys: Vec<String> = index.oldest_first().into_iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["old", "mid", "new"]);
    }

    #[test]
    fn test_ttl_precedence() {
        assert_eq!(effective_ttl_ms(Some(1), Some(2), 3), 1);
        assert_eq!(effective_ttl_ms(None, Some(2), 3), 2);
        assert_eq!(effective_ttl_ms(None, None, 3), 3);
    }

    #[test]
    fn test_expiry_boundary() {
        assert!(!is_expired(1_000, 500, 1_499));
        assert!(!is_expired(1_000, 500, 1_500));
        assert!(is_expired(1_000, 500, 1_501));
    }

    #[test]
    fn test_prompt_preview_is_char_safe() {
        let prompt = "é".repeat(300);
        let preview = prompt_preview(&prompt);
        assert_eq!(preview.chars().count(), PROMPT_PREVIEW_CHARS);
        assert_eq!(prompt_preview("short"), "short");
    }
}
