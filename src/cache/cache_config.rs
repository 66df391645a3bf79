//! Configuración de cache
//!
//! Este módulo contiene la configuración para el sistema de cache.

use serde::{Deserialize, Serialize};

use crate::config::environment::EnvironmentConfig;

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl: u64,
    pub key_prefix: String,
}

impl CacheConfig {
    /// `None` si no hay `REDIS_URL`: el servicio funciona sin cache
    pub fn from_environment(config: &EnvironmentConfig) -> Option<Self> {
        config.redis_url.as_ref().map(|url| Self {
            redis_url: url.clone(),
            default_ttl: config.stats_cache_ttl,
            key_prefix: "autoaid".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_disabled_without_redis_url() {
        assert!(CacheConfig::from_environment(&EnvironmentConfig::default()).is_none());

        let config = EnvironmentConfig {
            redis_url: Some("redis://localhost:6379".to_string()),
            stats_cache_ttl: 30,
            ..Default::default()
        };
        let cache = CacheConfig::from_environment(&config).unwrap();
        assert_eq!(cache.default_ttl, 30);
    }
}
