//! Cache-aside coordinator
//!
//! Reads go through [`CacheAside::get_or_set`]: a hit is returned as stored,
//! a miss runs the caller's fetch against the origin and stores the result.
//! Writes go to the origin first and are then mirrored into the cache with
//! [`CacheAside::write_through`], or orphan a collection's listing pages with
//! [`CacheAside::invalidate_collection`].

use crate::cache::config::{CacheConfig, StoreErrorPolicy};
use crate::cache::invalidation::{InvalidationEvent, InvalidationReason};
use crate::cache::keys::VersionedCollection;
use crate::cache::single_flight::{await_leader, Flight, FlightOutcome, SingleFlight};
use crate::cache::types::{CacheKey, CacheStats, CacheValue, Counter, StatsRecorder};
use crate::error::{CacheError, Result};
use crate::store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// JSON `null` is never cached and reads back as a miss
const NULL_PAYLOAD: &str = "null";

/// Cache-aside access to a [`KeyValueStore`]
///
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct CacheAside {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    flights: SingleFlight,
    stats: StatsRecorder,
}

impl CacheAside {
    /// Create a coordinator with the default (strict) configuration
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            config: CacheConfig::default(),
            flights: SingleFlight::default(),
            stats: StatsRecorder::new(true),
        }
    }

    /// Create a coordinator with a validated configuration
    pub fn with_config(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            stats: StatsRecorder::new(config.enable_metrics),
            config,
            flights: SingleFlight::default(),
        })
    }

    /// The underlying store handle
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Return the cached value at `key`, or fetch it from the origin and cache it.
    ///
    /// A hit is trusted for the rest of its TTL. On a miss `fetch` runs and a
    /// `Some` result is stored under `key` for `ttl`. `None` is returned to
    /// the caller but never cached, so lookups of absent entities always reach
    /// the origin. Fetch errors are returned untouched and nothing is written.
    ///
    /// Concurrent misses on the same key each fetch and each write, last
    /// write wins, unless [`CacheConfig::coalesce_misses`] is on.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> std::result::Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        if let Some(value) = self.lookup(key).await? {
            debug!("Cache hit: {}", key);
            self.stats.record(Counter::Hit);
            return Ok(Some(value));
        }

        debug!("Cache miss: {}", key);
        self.stats.record(Counter::Miss);

        if !self.config.coalesce_misses {
            return self.populate(key, ttl, fetch).await.map(|(value, _)| value);
        }

        match self.flights.join(key) {
            Flight::Leader(leader) => match self.populate(key, ttl, fetch).await {
                Ok((value, encoded)) => {
                    leader.complete(match encoded {
                        Some(raw) => FlightOutcome::Found(raw),
                        None => FlightOutcome::Empty,
                    });
                    Ok(value)
                }
                Err(e) => {
                    leader.complete(FlightOutcome::Failed);
                    Err(e)
                }
            },
            Flight::Follower(slot) => match await_leader(slot).await {
                Some(FlightOutcome::Found(raw)) => {
                    self.stats.record(Counter::Coalesced);
                    Ok(Some(decode(key, &raw)?))
                }
                Some(FlightOutcome::Empty) => {
                    self.stats.record(Counter::Coalesced);
                    Ok(None)
                }
                Some(FlightOutcome::Failed) => Err(CacheError::CoalescedFetchFailed {
                    key: key.to_string(),
                }
                .into()),
                None => {
                    debug!("Leader for {} abandoned its fetch, fetching directly", key);
                    self.populate(key, ttl, fetch).await.map(|(value, _)| value)
                }
            },
        }
    }

    /// Read and decode `key` without touching the origin
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.stats.record(Counter::StoreError);
                return Err(e);
            }
        };

        match raw {
            Some(raw) if raw != NULL_PAYLOAD => decode(key, &raw).map(Some),
            _ => Ok(None),
        }
    }

    /// Mirror a value just written to the origin into every key it is
    /// indexed under (e.g. by identifier and by natural key).
    pub async fn write_through<T: Serialize>(
        &self,
        keys: &[CacheKey],
        value: &T,
        ttl: Duration,
    ) -> Result<InvalidationEvent> {
        let encoded = encode(value)?;
        let mut written = Vec::with_capacity(keys.len());

        match encoded {
            Some(raw) => {
                for key in keys {
                    if self.store_value(key, &raw, ttl).await? {
                        written.push(key.clone());
                    }
                }
            }
            None => debug!("Write-through skipped for null value: {:?}", keys),
        }

        let event = InvalidationEvent::new(InvalidationReason::WriteThrough, written);
        debug!("Write-through refreshed {} keys", event.keys.len());
        Ok(event)
    }

    /// Current version of a collection's listing pages; 0 before the first bump
    pub async fn current_version(&self, collection: &VersionedCollection) -> Result<u64> {
        let key = collection.version_key();

        let raw = match self.store.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.stats.record(Counter::StoreError);
                return Err(e);
            }
        };

        match raw {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CacheError::SerializationError(format!(
                    "version counter {} holds non-integer {}",
                    key, raw
                ))
            }),
            None => Ok(0),
        }
    }

    /// Orphan every cached listing page of `collection` by advancing its version.
    ///
    /// Old pages are not deleted; they stay readable under their old keys
    /// until their TTL runs out, but no new read computes those keys.
    pub async fn invalidate_collection(
        &self,
        collection: &VersionedCollection,
    ) -> Result<InvalidationEvent> {
        let key = collection.version_key();

        let version = match self.store.increment(&key).await {
            Ok(version) => version.max(0) as u64,
            Err(e) => {
                self.stats.record(Counter::StoreError);
                return Err(e);
            }
        };
        self.stats.record(Counter::Invalidation);

        let reason = InvalidationReason::VersionBump {
            collection: collection.namespace().to_string(),
            version,
        };
        info!("Invalidated listing pages: {}", reason);
        Ok(InvalidationEvent::new(reason, vec![key]))
    }

    /// Key of one listing page under the collection's current version
    pub async fn listing_key(
        &self,
        collection: &VersionedCollection,
        page: u32,
        filter_hash: &str,
    ) -> Result<CacheKey> {
        let version = self.current_version(collection).await?;
        Ok(collection.page_key(version, page, filter_hash))
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await {
            Ok(value) => Ok(value),
            Err(e) if self.config.on_store_error == StoreErrorPolicy::FallThrough => {
                warn!("Cache read for {} failed, treating as miss: {}", key, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run the fetch and store a non-empty result. Returns the value and its
    /// encoding so a coalescing leader can share it.
    async fn populate<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> std::result::Result<(Option<T>, Option<CacheValue>), E>
    where
        T: Serialize,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        self.stats.record(Counter::Fetch);
        let fetched = fetch().await?;

        let Some(value) = fetched else {
            debug!("Origin has nothing for {}, not caching", key);
            self.stats.record(Counter::EmptyFetch);
            return Ok((None, None));
        };

        let encoded = encode(&value)?;
        if let Some(raw) = &encoded {
            self.store_value(key, raw, ttl).await?;
        }

        Ok((Some(value), encoded))
    }

    /// Write one encoded value. `Ok(false)` means the write failed and was
    /// dropped under the fall-through policy.
    async fn store_value(&self, key: &str, raw: &str, ttl: Duration) -> Result<bool> {
        let ttl = self.config.ttl_with_jitter(ttl);

        match self.store.set(key, raw, ttl).await {
            Ok(()) => {
                debug!("Cached {} for {:?}", key, ttl);
                self.stats.record(Counter::Write);
                Ok(true)
            }
            Err(e) => {
                self.stats.record(Counter::StoreError);
                if self.config.on_store_error == StoreErrorPolicy::FallThrough {
                    warn!("Cache write for {} failed, continuing without it: {}", key, e);
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }
}

/// JSON encoding of `value`, or `None` when it encodes to `null`
fn encode<T: Serialize>(value: &T) -> Result<Option<CacheValue>> {
    let raw = serde_json::to_string(value)?;
    Ok((raw != NULL_PAYLOAD).then_some(raw))
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        CacheError::SerializationError(format!("cached value at {} is unreadable: {}", key, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::{product_key, PRODUCTS};
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Product {
        sku: String,
        name: String,
        quantity: u32,
    }

    fn widget() -> Product {
        Product {
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            quantity: 12,
        }
    }

    fn coordinator() -> (CacheAside, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(Arc::new(ManualClock::at_unix(1_700_000_000))));
        (CacheAside::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, _) = coordinator();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Option<Product> = cache
                .get_or_set(&product_key("SKU-1"), Duration::from_secs(300), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(Some(widget()))
                })
                .await
                .unwrap();
            assert_eq!(value, Some(widget()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[tokio::test]
    async fn test_stored_null_reads_as_miss() {
        let (cache, store) = coordinator();
        store.set("product:SKU-1", "null", Duration::from_secs(60)).await.unwrap();

        let value: Option<Product> = cache.get("product:SKU-1").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_option_none_payload_not_cached() {
        let (cache, store) = coordinator();

        let value: Option<Option<u32>> = cache
            .get_or_set("k", Duration::from_secs(60), || async {
                Ok::<_, CacheError>(Some(None))
            })
            .await
            .unwrap();

        assert_eq!(value, Some(None));
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_read_error() {
        let (cache, store) = coordinator();
        store.set("product:SKU-1", "{not json", Duration::from_secs(60)).await.unwrap();

        let result: Result<Option<Product>> = cache
            .get_or_set("product:SKU-1", Duration::from_secs(60), || async {
                Ok(Some(widget()))
            })
            .await;
        assert!(matches!(result, Err(CacheError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_write_through_skips_null() {
        let (cache, _) = coordinator();
        let event = cache
            .write_through(&["a".to_string()], &Option::<u32>::None, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(event.keys.is_empty());
    }

    #[tokio::test]
    async fn test_version_starts_at_zero() {
        let (cache, _) = coordinator();
        assert_eq!(cache.current_version(&PRODUCTS).await.unwrap(), 0);
        assert_eq!(
            cache.listing_key(&PRODUCTS, 1, "45h").await.unwrap(),
            "products:v0:1:45h"
        );
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (_, store) = coordinator();
        let config = CacheConfig::builder().ttl_jitter(2.0).build();
        assert!(CacheAside::with_config(store, config).is_err());
    }
}
