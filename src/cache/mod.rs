//! Cache
//!
//! Cache Redis opcional para los informes de estadísticas.

pub mod cache_config;
pub mod redis_client;
pub mod stats_cache;

pub use cache_config::CacheConfig;
pub use stats_cache::StatsCache;
