use anyhow::Result;
use redis::{aio::ConnectionManager, AsyncCommands, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::CacheConfig;

/// Cliente Redis con connection manager y operaciones async
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: CacheConfig,
}

impl RedisClient {
    /// Crear nuevo cliente Redis
    pub async fn new(config: CacheConfig) -> Result<Self> {
        info!("🔗 Conectando a Redis...");

        let client = redis::Client::open(config.redis_url.clone())?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis conectado exitosamente");

        Ok(Self { manager, config })
    }

    /// Generar clave de cache con prefijo
    pub fn make_key(&self, prefix: &str, identifier: &str) -> String {
        format!("{}:{}:{}", self.config.key_prefix, prefix, identifier)
    }

    pub fn default_ttl(&self) -> u64 {
        self.config.default_ttl
    }

    /// Lee y deserializa; un fallo de Redis cuenta como MISS
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.manager.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!("📥 Cache HIT para clave: {}", key);
                Ok(Some(serde_json::from_str(&value)?))
            }
            Ok(None) => {
                debug!("❌ Cache MISS para clave: {}", key);
                Ok(None)
            }
            Err(e) => {
                warn!("⚠️ Error leyendo cache para clave {}: {}", key, e);
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: u64) -> Result<()> {
        let mut conn = self.manager.clone();
        let serialized = serde_json::to_string(value)?;

        let result: RedisResult<()> = conn.set_ex(key, serialized, ttl).await;
        match result {
            Ok(()) => {
                debug!("💾 Cache SET para clave: {} (TTL: {}s)", key, ttl);
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Error de Redis: {}", e)),
        }
    }
}
