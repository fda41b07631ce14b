//! Redis-backed durable store
//!
//! Wraps a `ConnectionManager` so every caller shares one auto-reconnecting
//! handle. List operations map to RPUSH/LPOP, which gives the waiting queue
//! strict FIFO order and an atomic single-claimant pop.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, IntoConnectionInfo};
use tracing::info;

use crate::config::Args;
use crate::store::KvStore;
use crate::types::{AlcoveError, Result};

/// Redis client wrapper
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis and verify the connection with a PING
    pub async fn connect(args: &Args) -> Result<Self> {
        info!("Connecting to Redis at {} (db {})", args.redis_url, args.redis_db);

        let mut conn_info = args
            .redis_url
            .as_str()
            .into_connection_info()
            .map_err(|e| AlcoveError::Store(format!("invalid Redis URL: {}", e)))?;
        if let Some(ref password) = args.redis_password {
            conn_info.redis.password = Some(password.clone());
        }
        conn_info.redis.db = args.redis_db;

        let client = redis::Client::open(conn_info)
            .map_err(|e| AlcoveError::Store(format!("failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| AlcoveError::Store(format!("failed to connect to Redis: {}", e)))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| AlcoveError::Store(format!("Redis ping failed: {}", e)))?;

        info!("Connected to Redis (PING -> {})", pong);

        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn list_push_tail(&self, list: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(list, value).await?;
        Ok(())
    }

    async fn list_pop_head(&self, list: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.lpop(list, None).await?)
    }

    async fn list_len(&self, list: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(list).await?)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
