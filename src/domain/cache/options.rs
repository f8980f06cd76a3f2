//! Cache tuning options

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const DEFAULT_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;
pub const DEFAULT_DISK_LIMIT_MB: u64 = 20;
pub const DEFAULT_MEMORY_LIMIT: usize = 200;
pub const DEFAULT_WARMUP_TOP_K: usize = 80;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Options controlling both cache tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheOptions {
    pub enabled: bool,
    /// Default entry lifetime in milliseconds
    #[serde(alias = "ttl_ms")]
    pub ttl_ms: u64,
    /// Disk budget for the durable tier
    #[serde(rename = "diskLimitMB", alias = "disk_limit_mb")]
    pub disk_limit_mb: u64,
    /// Maximum number of entries held in memory
    #[serde(alias = "memory_limit")]
    pub memory_limit: usize,
    /// Number of recent entries loaded into memory at startup
    #[serde(alias = "warmup_top_k")]
    pub warmup_top_k: usize,
    /// Whether raw model payloads are persisted next to results
    #[serde(alias = "save_raw")]
    pub save_raw: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: DEFAULT_TTL_MS,
            disk_limit_mb: DEFAULT_DISK_LIMIT_MB,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            warmup_top_k: DEFAULT_WARMUP_TOP_K,
            save_raw: false,
        }
    }
}

impl CacheOptions {
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_disk_limit_mb(mut self, disk_limit_mb: u64) -> Self {
        self.disk_limit_mb = disk_limit_mb;
        self
    }

    pub fn with_memory_limit(mut self, memory_limit: usize) -> Self {
        self.memory_limit = memory_limit;
        self
    }

    pub fn with_warmup_top_k(mut self, warmup_top_k: usize) -> Self {
        self.warmup_top_k = warmup_top_k;
        self
    }

    pub fn with_save_raw(mut self) -> Self {
        self.save_raw = true;
        self
    }

    pub fn disk_limit_bytes(&self) -> u64 {
        self.disk_limit_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.ttl_ms == 0 {
            return Err(DomainError::configuration("ttlMs must be greater than zero"));
        }

        if self.disk_limit_mb == 0 {
            return Err(DomainError::configuration(
                "diskLimitMB must be greater than zero",
            ));
        }

        Ok(())
    }
}
