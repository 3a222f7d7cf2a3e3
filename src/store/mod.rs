//! # Key-value store clients
//!
//! The cache layer and the rate limiter only ever talk to a [`KeyValueStore`]:
//! four primitives (`get`, `set` with expiry, atomic `increment`, `expire`)
//! that any Redis-like service provides.
//!
//! Three implementations ship with the crate:
//! - [`RestStore`] - a REST-accessed key-value service (JSON command arrays over HTTPS)
//! - [`RedisStore`] - a direct Redis connection
//! - [`MemoryStore`] - in-process, for tests and local development
//!
//! A store is built once at start-up with [`connect`] and handed to every
//! component that needs it as an `Arc<dyn KeyValueStore>`. The connection is
//! released when the last handle is dropped.

pub mod config;
pub mod health;
pub mod memory;
pub mod redis_store;
pub mod rest;

pub use config::{StoreBackend, StoreConfig};
pub use health::{check_store, HealthCheckConfig, HealthCheckMethod, HealthCheckResult, HealthStatus};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use rest::RestStore;

use crate::cache::types::CacheValue;
use crate::clock::SystemClock;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Contract of the remote key-value service.
///
/// `increment` must be atomic across concurrent callers. Single-key
/// operations from one caller are observed in order. Errors are returned,
/// never retried.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Stored value, or `None` when the key is missing or expired
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Store `value`, replacing any previous one, expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Atomically add one to the counter at `key` (a missing key counts from 0)
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Assign or refresh the expiry of an existing key, leaving its value alone
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Round-trip to the store without touching any key
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and health reports
    fn backend_name(&self) -> &'static str;
}

/// TTL in whole seconds as the store expects it; never zero.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Build the store described by `config`.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>> {
    config.validate()?;

    let store: Arc<dyn KeyValueStore> = match &config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(Arc::new(SystemClock))),
        StoreBackend::Rest { url, token } => {
            Arc::new(RestStore::new(url, token, config.timeout)?)
        }
        StoreBackend::Redis { url } => Arc::new(RedisStore::connect(url, config.timeout).await?),
    };

    info!("Key-value store ready (backend: {})", store.backend_name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[test]
    fn test_ttl_seconds_never_zero() {
        assert_eq!(ttl_seconds(Duration::from_millis(200)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(60)), 60);
        assert_eq!(ttl_seconds(Duration::from_millis(2500)), 2);
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = StoreConfig::memory();
        let store = connect(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");

        store.set("k", "\"v\"", Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("\"v\"".to_string()));
    }

    #[test]
    fn test_connect_rejects_invalid_config() {
        let config = StoreConfig::redis("http://not-redis");
        let result = tokio_test::block_on(connect(&config));
        assert!(matches!(result, Err(CacheError::ConfigError(_))));
    }
}
