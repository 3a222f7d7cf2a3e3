//! Direct Redis connection implementing the key-value contract

use crate::cache::types::CacheValue;
use crate::error::{CacheError, Result};
use crate::store::{ttl_seconds, KeyValueStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Cmd, FromRedisValue};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed key-value store
///
/// The connection manager multiplexes commands over one connection and
/// reconnects on its own; every command is bounded by `timeout`.
pub struct RedisStore {
    manager: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (e.g. `redis://localhost:6379`)
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to Redis at {}", url);

        let client =
            redis::Client::open(url).map_err(|e| CacheError::ConfigError(e.to_string()))?;

        let manager = bounded(timeout, "connect", ConnectionManager::new(client))
            .await?
            .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        info!("Successfully connected to Redis");
        Ok(Self { manager, timeout })
    }

    async fn run<T: FromRedisValue>(&self, cmd: Cmd, name: &str) -> Result<T> {
        debug!("Redis command: {}", name);
        let mut conn = self.manager.clone();
        let reply = bounded(self.timeout, name, async move { cmd.query_async(&mut conn).await })
            .await??;
        Ok(reply)
    }
}

async fn bounded<F: Future>(timeout: Duration, context: &str, fut: F) -> Result<F::Output> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CacheError::TimeoutError {
            timeout_ms: timeout.as_millis() as u64,
            context: context.to_string(),
        })
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run(cmd, "GET").await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_seconds(ttl));
        self.run(cmd, "SET").await
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.run(cmd, "INCR").await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(ttl_seconds(ttl));
        let _updated: i64 = self.run(cmd, "EXPIRE").await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let _pong: String = self.run(redis::cmd("PING"), "PING").await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
