//! Application services

mod analysis_cache_service;
mod cache_handle;

pub use analysis_cache_service::{AnalysisCache, AnalysisCacheBuilder, CacheStats, CacheValue};
pub use cache_handle::CacheHandle;
