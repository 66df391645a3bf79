//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub storage_timeout_ms: u64,
    pub redis_url: Option<String>,
    pub stats_cache_ttl: u64,
    pub run_migrations: bool,
    pub log_level: String,
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", name, value)),
        Err(_) => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Leer configuración desde las variables de entorno
    pub fn from_env() -> Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_development = environment == "development";

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if is_development => "development-secret-change-me".to_string(),
            _ => anyhow::bail!("JWT_SECRET must be set outside development"),
        };

        let default_level = if is_development { "debug" } else { "info" };

        Ok(Self {
            port: parse_var("PORT", 5000)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION", 7 * 24 * 3600)?,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            storage_timeout_ms: parse_var("STORAGE_TIMEOUT_MS", 5000)?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            stats_cache_ttl: parse_var("STATS_CACHE_TTL", 60)?,
            run_migrations: parse_var("RUN_MIGRATIONS", true)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_level.to_string()),
            environment,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}

impl Default for EnvironmentConfig {
    /// Configuración de desarrollo, usada por los tests
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 5000,
            host: "127.0.0.1".to_string(),
            database_url: None,
            jwt_secret: "development-secret-change-me".to_string(),
            jwt_expiration: 7 * 24 * 3600,
            cors_origins: Vec::new(),
            storage_timeout_ms: 5000,
            redis_url: None,
            stats_cache_ttl: 60,
            run_migrations: false,
            log_level: "debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_development() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.storage_timeout(), Duration::from_millis(5000));
        assert_eq!(config.server_url(), "127.0.0.1:5000");
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let config = EnvironmentConfig {
            log_level: "chatty".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }
}
