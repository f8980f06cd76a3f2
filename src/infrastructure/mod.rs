//! Infrastructure layer - storage, cache tiers, services and observability

pub mod cache;
pub mod logging;
pub mod observability;
pub mod services;
pub mod storage;
