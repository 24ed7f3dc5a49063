//! Redis key-value backend for session storage
//!
//! This module provides functionality for connecting to Redis and performing
//! the small set of operations the session store needs: conditional SET with
//! TTL, GET, DEL and a health check. Every operation is bounded by a
//! configurable timeout so a stalled backend surfaces as a typed error
//! instead of hanging the caller.

use std::future::Future;
use std::time::Duration;

use redis::{AsyncCommands, Client, RedisResult};
use tokio::time::timeout;
use tracing::info;

use crate::error::{CacheError, CacheResult};

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Per-operation timeout in milliseconds
    pub op_timeout_ms: u64,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `REDIS_MAX_CONNECTIONS`: Maximum number of connections (default: 10)
    /// - `REDIS_OP_TIMEOUT_MS`: Per-operation timeout in ms (default: 2000)
    pub fn from_env() -> Self {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let max_connections = std::env::var("REDIS_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let op_timeout_ms = std::env::var("REDIS_OP_TIMEOUT_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()
            .unwrap_or(2000);

        RedisConfig {
            url,
            max_connections,
            op_timeout_ms,
        }
    }
}

/// Redis connection handle shared by the session store
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    op_timeout: Duration,
}

impl RedisPool {
    /// Initialize a new Redis connection pool
    pub fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        })
    }

    /// Get a connection from the pool
    async fn get_connection(&self) -> RedisResult<redis::aio::MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await
    }

    /// Run a command future under the operation timeout
    async fn bounded<T>(&self, fut: impl Future<Output = RedisResult<T>>) -> CacheResult<T> {
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::Command(e)),
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }

    /// Set a key only if it does not already exist, with a TTL in seconds.
    ///
    /// Returns `true` if the key was written, `false` if it already existed.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<bool> {
        self.bounded(async {
            let mut conn = self.get_connection().await?;
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
        .await
    }

    /// Overwrite a key only if it already exists, with a fresh TTL in seconds.
    ///
    /// Returns `true` if the key was rewritten, `false` if it was absent.
    pub async fn set_xx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<bool> {
        self.bounded(async {
            let mut conn = self.get_connection().await?;
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("XX")
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
        .await
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.bounded(async {
            let mut conn = self.get_connection().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    /// Delete a key from Redis
    ///
    /// Returns `true` if a key was actually removed.
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.bounded(async {
            let mut conn = self.get_connection().await?;
            let removed: u64 = conn.del(key).await?;
            Ok(removed > 0)
        })
        .await
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        self.bounded(async {
            let mut conn = self.get_connection().await?;
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(pong == "PONG")
        })
        .await
    }
}
