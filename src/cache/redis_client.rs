//! Cliente Redis con connection pooling y operaciones async
//!
//! Además del get/set con TTL, expone el borrado por prefijo (invalidación
//! de disponibilidad por vehículo/grupo), la adquisición atómica de locks
//! SET NX EX para los jobs en background, y publish para eventos.

use anyhow::Result;
use redis::{aio::ConnectionManager, AsyncCommands, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{keys, CacheConfig};

/// Operaciones básicas de cache
#[async_trait::async_trait]
pub trait CacheOperations {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: u64) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: CacheConfig,
}

impl RedisClient {
    /// Crear nuevo cliente Redis
    pub async fn new(config: CacheConfig) -> Result<Self> {
        info!("🔗 Conectando a Redis: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.clone())?;
        let manager = ConnectionManager::new(client).await?;

        // Test de conexión usando un comando simple
        let mut conn = manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis conectado exitosamente");

        Ok(Self { manager, config })
    }

    pub fn default_ttl(&self) -> u64 {
        self.config.default_ttl
    }

    /// Borrar todas las claves bajo un prefijo (SCAN + DEL).
    /// Idempotente: borrar un prefijo sin claves es un no-op, y los errores
    /// de Redis se degradan a warning en vez de propagarse.
    pub async fn delete_by_prefix(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let scan: RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await;

            let (next_cursor, batch) = match scan {
                Ok(r) => r,
                Err(e) => {
                    warn!("⚠️ Error en SCAN para prefijo {}: {}", prefix, e);
                    return Ok(deleted);
                }
            };

            if !batch.is_empty() {
                match conn.del::<_, i64>(batch.clone()).await {
                    Ok(count) => deleted += count as u64,
                    Err(e) => warn!("⚠️ Error borrando {} claves: {}", batch.len(), e),
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("🗑️ Invalidación por prefijo {}: {} claves", prefix, deleted);
        Ok(deleted)
    }

    /// Adquirir un lock distribuido con TTL (SET NX EX).
    /// Devuelve true si este proceso obtuvo el lock. Un fallo de Redis se
    /// trata como lock no adquirido: el job se salta la ejecución.
    pub async fn acquire_lock(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let mut conn = self.manager.clone();
        let token = Uuid::new_v4().to_string();

        let result: RedisResult<Option<String>> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(Some(_)) => {
                debug!("🔒 Lock adquirido: {} (TTL: {}s)", key, ttl_secs);
                Ok(true)
            }
            Ok(None) => {
                debug!("⏭️ Lock ocupado: {}", key);
                Ok(false)
            }
            Err(e) => {
                warn!("⚠️ Error adquiriendo lock {}: {}", key, e);
                Ok(false)
            }
        }
    }

    /// Liberar un lock al terminar el job
    pub async fn release_lock(&self, key: &str) {
        let mut conn = self.manager.clone();
        if let Err(e) = conn.del::<_, i64>(key).await {
            warn!("⚠️ Error liberando lock {}: {}", key, e);
        }
    }

    /// Publicar un payload en un canal (eventos de ciclo de vida)
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let result: RedisResult<i64> = conn.publish(channel, payload).await;
        match result {
            Ok(receivers) => {
                debug!("📣 Evento publicado en {} ({} suscriptores)", channel, receivers);
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Error de Redis en publish: {}", e)),
        }
    }

    /// Verificar si Redis está conectado
    pub async fn is_connected(&self) -> bool {
        let mut conn = self.manager.clone();
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(response) => response == "PONG",
            Err(_) => false,
        }
    }

    /// Clave de lock distribuido de un job
    pub fn lock_key(&self, job_name: &str) -> String {
        keys::lock_key(job_name)
    }
}

#[async_trait::async_trait]
impl CacheOperations for RedisClient {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.manager.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!("📥 Cache HIT para clave: {}", key);
                let deserialized: T = serde_json::from_str(&value)?;
                Ok(Some(deserialized))
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

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: u64) -> Result<()> {
        let mut conn = self.manager.clone();

        let serialized = serde_json::to_string(value)?;

        let result: RedisResult<()> = conn.set_ex(key, serialized, ttl).await;

        match result {
            Ok(()) => {
                debug!("💾 Cache SET para clave: {} (TTL: {}s)", key, ttl);
                Ok(())
            }
            Err(e) => {
                error!("❌ Error guardando en cache para clave {}: {}", key, e);
                Err(anyhow::anyhow!("Error de Redis: {}", e))
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();

        let result: RedisResult<i64> = conn.del(key).await;

        match result {
            Ok(count) => {
                debug!("🗑️ Cache DELETE para clave: {} (eliminados: {})", key, count);
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ Error eliminando cache para clave {}: {}", key, e);
                Ok(()) // No fallar si no se puede eliminar
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();

        match conn.exists(key).await {
            Ok(exists) => Ok(exists),
            Err(e) => {
                warn!("⚠️ Error verificando existencia de clave {}: {}", key, e);
                Ok(false)
            }
        }
    }
}
