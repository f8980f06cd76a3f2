//! CI Analysis Cache
//!
//! Content-addressed caching of LLM-backed CI failure analysis:
//! - Deterministic SHA-256 keys over model, prompt version, preprocessing and prompt
//! - A bounded in-memory recency tier in front of per-entry JSON files
//! - Disk budget enforcement by least recent access
//! - Single-flight computation of concurrent misses

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{CacheOptions, DomainError, KeyParts, PreprocessingDescriptor, compute_key_hash};
pub use infrastructure::cache::CacheLocation;
pub use infrastructure::services::{AnalysisCache, AnalysisCacheBuilder, CacheHandle, CacheStats};
