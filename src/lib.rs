//! # Inventory Cache (inventory-cache)
//!
//! Cache-aside access layer and fixed-window rate limiter for the inventory
//! service, built on a remote key-value store.
//!
//! ## Features
//!
//! - Get-or-populate caching with per-entity-class TTLs
//! - Write-through refresh of every key an entity is indexed under
//! - Versioned bulk invalidation of cached listing pages
//! - Fixed-window per-identity rate limiting
//! - REST, Redis and in-memory store backends behind one trait
//! - Store health checks
//!
//! ## Connecting
//!
//! The store is built once and shared by handle with everything that needs it.
//!
//! ```no_run
//! use inventory_cache::{store, CacheAside, FixedWindowRateLimiter, StoreConfig, SystemClock};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = store::connect(&StoreConfig::from_env()?).await?;
//!
//!     let cache = CacheAside::new(store.clone());
//!     let limiter = FixedWindowRateLimiter::new(store, Arc::new(SystemClock));
//!     # let _ = (cache, limiter);
//!     Ok(())
//! }
//! ```
//!
//! ## Caching a lookup
//!
//! ```no_run
//! use inventory_cache::cache::{keys, EntityClass};
//! use inventory_cache::{CacheAside, CacheError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Order {
//!     id: String,
//!     total_cents: u64,
//! }
//!
//! async fn load_order(cache: &CacheAside, id: &str) -> Result<Option<Order>, CacheError> {
//!     cache
//!         .get_or_set(&keys::order_key(id), EntityClass::Order.ttl(), || async {
//!             // Query the document store; Ok(None) when the order does not exist
//!             Ok(None)
//!         })
//!         .await
//! }
//! ```
//!
//! ## Invalidating listings
//!
//! ```no_run
//! use inventory_cache::cache::keys::{filter_hash, PRODUCTS};
//! use inventory_cache::{CacheAside, CacheError};
//!
//! async fn after_product_change(cache: &CacheAside) -> Result<(), CacheError> {
//!     // Every listing page cached so far is now unreachable
//!     cache.invalidate_collection(&PRODUCTS).await?;
//!
//!     // Reads compute keys under the new version
//!     let key = cache.listing_key(&PRODUCTS, 1, &filter_hash("category=tools")).await?;
//!     assert!(key.starts_with("products:v"));
//!     Ok(())
//! }
//! ```
//!
//! ## Rate limiting
//!
//! ```no_run
//! use inventory_cache::{FailurePolicy, FixedWindowRateLimiter};
//! use std::time::Duration;
//!
//! async fn admit(limiter: &FixedWindowRateLimiter, ip: &str) -> bool {
//!     limiter
//!         .allow_or(ip, 100, Duration::from_secs(60), FailurePolicy::FailOpen)
//!         .await
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod rate_limit;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use cache::{
    CacheAside, CacheConfig, CacheConfigBuilder, CacheKey, CacheKeyBuilder, CacheStats,
    CacheValue, EntityClass, InvalidationEvent, InvalidationReason, Namespace, StoreErrorPolicy,
    VersionedCollection,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use rate_limit::{FailurePolicy, FixedWindowRateLimiter, RateLimitDecision, RateLimitRule};
pub use store::{
    check_store, HealthCheckConfig, HealthCheckMethod, HealthCheckResult, HealthStatus,
    KeyValueStore, MemoryStore, RedisStore, RestStore, StoreBackend, StoreConfig,
};
