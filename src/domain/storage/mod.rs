//! Storage domain - the host's persistent key-value namespace

mod repository;

pub use repository::{KeyValueStore, KeyValueStoreExt};

#[cfg(test)]
pub use repository::mock::MockKeyValueStore;
