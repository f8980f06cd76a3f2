//! Cache metrics
//!
//! Counters are emitted through the `metrics` facade; they are no-ops until
//! the host installs a recorder.

use metrics::counter;

/// Tier that answered (or failed to answer) a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Disk,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Hit,
    Miss,
    Expired,
}

impl LookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Expired => "expired",
        }
    }
}

/// Record a cache lookup
pub fn record_cache_lookup(cache: &str, tier: CacheTier, outcome: LookupOutcome) {
    let labels = [
        ("cache", cache.to_string()),
        ("tier", tier.as_str().to_string()),
        ("outcome", outcome.as_str().to_string()),
    ];

    counter!("analysis_cache_lookups_total", &labels).increment(1);
}

/// Record entries evicted by garbage collection
pub fn record_cache_evictions(cache: &str, count: usize) {
    if count == 0 {
        return;
    }

    counter!("analysis_cache_evictions_total", "cache" => cache.to_string())
        .increment(count as u64);
}

/// Record a producer invocation made on a cache miss
pub fn record_producer_call(cache: &str, success: bool) {
    let labels = [
        ("cache", cache.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("analysis_cache_producer_calls_total", &labels).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(CacheTier::Memory.as_str(), "memory");
        assert_eq!(CacheTier::Disk.as_str(), "disk");
        assert_eq!(LookupOutcome::Expired.as_str(), "expired");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_lookup("summary", CacheTier::Disk, LookupOutcome::Miss);
        record_cache_evictions("summary", 0);
        record_cache_evictions("summary", 3);
        record_producer_call("summary", false);
    }
}
