//! Cache domain - keys, entries and options of the analysis cache

mod cacheable;
mod clock;
mod entry;
mod key;
mod options;

pub use cacheable::{CacheablePredicate, is_meaningful, non_empty};
pub use clock::{Clock, SystemClock};
pub use entry::{
    CacheEntry, CacheIndex, ENTRY_SCHEMA_VERSION, IndexItem, PROMPT_PREVIEW_CHARS,
    effective_ttl_ms, is_expired, prompt_preview,
};
pub use key::{KeyParts, PreprocessingDescriptor, compute_key_hash, is_key_hash, sha256_hex};
pub use options::{
    CacheOptions, DEFAULT_DISK_LIMIT_MB, DEFAULT_MEMORY_LIMIT, DEFAULT_TTL_MS,
    DEFAULT_WARMUP_TOP_K,
};

#[cfg(test)]
pub use clock::mock::ManualClock;
