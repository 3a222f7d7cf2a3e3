//! # Cache-Aside Access Layer
//!
//! Caches documents from the origin (the document database) in the remote
//! key-value store.
//!
//! ## Features
//!
//! - **Get-or-populate**: hits are trusted until TTL expiry, misses run a
//!   caller-supplied fetch and store the result
//! - **No negative caching**: an absent or `null` result is never stored
//! - **Write-through**: mutations overwrite every key an entity is indexed under
//! - **Versioned invalidation**: bumping a collection's version counter moves
//!   listing reads to fresh keys; old pages expire on their own
//! - **Per-class TTLs**: short for stock levels, long for product master data
//! - **Optional miss coalescing**: concurrent misses on one key share a fetch
//!
//! ## Example
//!
//! ```rust
//! use inventory_cache::cache::{keys, CacheAside, EntityClass};
//! use inventory_cache::{CacheError, MemoryStore, SystemClock};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), CacheError> {
//! let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
//! let cache = CacheAside::new(store);
//!
//! let name: Option<String> = cache
//!     .get_or_set(&keys::product_key("SKU-001"), EntityClass::Product.ttl(), || async {
//!         // Load from the document store here
//!         Ok::<_, CacheError>(Some("Widget".to_string()))
//!     })
//!     .await?;
//!
//! assert_eq!(name.as_deref(), Some("Widget"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod invalidation;
pub mod keys;
pub(crate) mod single_flight;
pub mod ttl;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, StoreErrorPolicy};
pub use coordinator::CacheAside;
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use keys::{CacheKeyBuilder, Namespace, VersionedCollection};
pub use ttl::EntityClass;
pub use types::{CacheKey, CacheStats, CacheValue};
