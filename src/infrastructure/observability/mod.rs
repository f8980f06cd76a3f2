//! Observability infrastructure - cache metrics

mod metrics;

pub use metrics::{
    CacheTier, LookupOutcome, record_cache_evictions, record_cache_lookup, record_producer_call,
};
