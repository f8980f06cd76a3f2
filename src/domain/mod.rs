//! Domain layer - cache keys, entries, options and storage contracts

pub mod cache;
pub mod error;
pub mod storage;

pub use cache::{CacheEntry, CacheOptions, KeyParts, PreprocessingDescriptor, compute_key_hash};
pub use error::DomainError;
pub use storage::KeyValueStore;
