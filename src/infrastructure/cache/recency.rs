//! Bounded in-memory tier ordered by access recency

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

/// Insertion-ordered map where the last position is the most recently used
///
/// Reads through [`RecencyCache::get`] never reorder; callers promote
/// explicitly once a hit is confirmed.
#[derive(Debug)]
pub struct RecencyCache<V> {
    entries: Mutex<IndexMap<String, V>>,
    capacity: usize,
}

impl<V: Clone> RecencyCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity,
        }
    }

    fn entries(&self) -> MutexGuard<'_, IndexMap<String, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries().get(key).cloned()
    }

    /// Inserts or updates a value and makes it the most recent
    ///
    /// Returns the key evicted to stay within capacity, if any.
    pub fn insert(&self, key: impl Into<String>, value: V) -> Option<String> {
        let key = key.into();
        let mut entries = self.entries();

        entries.shift_remove(&key);
        entries.insert(key, value);

        if entries.len() > self.capacity {
            return entries.shift_remove_index(0).map(|(evicted, _)| evicted);
        }

        None
    }

    /// Promotes an existing key to most recent; returns false if absent
    pub fn record_access(&self, key: &str) -> bool {
        let mut entries = self.entries();

        match entries.shift_remove_entry(key) {
            Some((key, value)) => {
                entries.insert(key, value);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries().shift_remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}
