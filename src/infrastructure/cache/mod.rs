//! Cache infrastructure - the tiers behind the analysis cache

mod coalescer;
mod durable;
mod recency;

pub use coalescer::Coalescer;
pub use durable::{CacheLocation, DurableStore, INDEX_SCHEMA_VERSION};
pub use recency::RecencyCache;
